//! Signing Service Port - Off-chain KYC Attestation
//!
//! The signing service checks the user's KYC status off-chain and
//! returns an issuer signature over the claim. Requesting a signature
//! never touches chain state, so callers may retry freely.

use alloy::primitives::Address;
use async_trait::async_trait;

use crate::domain::claim::SignedClaim;
use crate::domain::error::SigningError;

/// Inputs of a signature request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRequest {
  /// Connected wallet.
  pub user_address: Address,
  /// Identity contract the claim will be added to.
  pub identity_address: Address,
  /// Fixed claim payload string.
  pub claim_data: String,
  /// Claim topic.
  pub topic: u64,
  /// ISO country code reported to the issuer.
  pub country_code: String,
}

/// Trait for attestation issuers.
#[async_trait]
pub trait SigningService: Send + Sync + 'static {
  /// Request an issuer signature for the claim described by `request`.
  async fn request_signature(
    &self,
    request: &SignatureRequest,
  ) -> Result<SignedClaim, SigningError>;
}
