//! Signing Service Request/Response Types
//!
//! Wire format of `POST /kyc-signature`. Numeric fields are accepted as
//! JSON numbers or strings (decimal or `0x` hex) because issuer
//! backends disagree on how they encode `v` and `topic`.

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::domain::claim::{ClaimSignature, SignedClaim};
use crate::ports::signing_service::SignatureRequest;

/// Request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KycSignatureRequest {
  /// Connected wallet (checksummed).
  pub user_address: String,
  /// Identity contract (checksummed).
  #[serde(rename = "onchainIDAddress")]
  pub onchain_id_address: String,
  /// Fixed claim payload.
  pub claim_data: String,
  /// Claim topic.
  pub topic: u64,
  /// ISO country code.
  pub country_code: String,
}

impl From<&SignatureRequest> for KycSignatureRequest {
  fn from(request: &SignatureRequest) -> Self {
    Self {
      user_address: request.user_address.to_string(),
      onchain_id_address: request.identity_address.to_string(),
      claim_data: request.claim_data.clone(),
      topic: request.topic,
      country_code: request.country_code.clone(),
    }
  }
}

/// Number encoded either as a JSON number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireNumber {
  Int(u64),
  Text(String),
}

impl WireNumber {
  pub fn as_u64(&self) -> Option<u64> {
    match self {
      Self::Int(n) => Some(*n),
      Self::Text(s) => {
        let s = s.trim();
        match s.strip_prefix("0x") {
          Some(hex) => u64::from_str_radix(hex, 16).ok(),
          None => s.parse().ok(),
        }
      }
    }
  }
}

/// Signature triple.
#[derive(Debug, Clone, Deserialize)]
pub struct WireSignature {
  pub r: String,
  pub s: String,
  pub v: WireNumber,
}

/// Response body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycSignatureResponse {
  pub signature: WireSignature,
  pub issuer_address: String,
  pub data_hash: String,
  pub topic: WireNumber,
}

/// Error body, when the service returns JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
  pub error: Option<String>,
  pub message: Option<String>,
}

impl TryFrom<KycSignatureResponse> for SignedClaim {
  type Error = String;

  fn try_from(wire: KycSignatureResponse) -> Result<Self, Self::Error> {
    let r: B256 = wire
      .signature
      .r
      .parse()
      .map_err(|e| format!("invalid signature.r: {e}"))?;
    let s: B256 = wire
      .signature
      .s
      .parse()
      .map_err(|e| format!("invalid signature.s: {e}"))?;
    let v = wire
      .signature
      .v
      .as_u64()
      .ok_or_else(|| "invalid signature.v".to_string())?;
    // Some signers return the raw recovery id.
    let v: u8 = match v {
      0 | 1 => 27 + u8::from(v == 1),
      27 => 27,
      28 => 28,
      other => return Err(format!("unexpected signature.v {other}")),
    };

    let issuer: Address = wire
      .issuer_address
      .parse()
      .map_err(|e| format!("invalid issuerAddress: {e}"))?;
    let data_hash: B256 = wire
      .data_hash
      .parse()
      .map_err(|e| format!("invalid dataHash: {e}"))?;
    let topic = wire
      .topic
      .as_u64()
      .ok_or_else(|| "invalid topic".to_string())?;

    Ok(Self {
      topic,
      issuer,
      data_hash,
      signature: ClaimSignature { r, s, v },
    })
  }
}

/// Best-effort human-readable message from an error response body.
pub fn error_message(body: &str) -> String {
  if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
    if let Some(msg) = parsed.error.or(parsed.message) {
      return msg;
    }
  }
  let trimmed = body.trim();
  if trimmed.is_empty() {
    return "no response body".to_string();
  }
  trimmed.chars().take(200).collect()
}
