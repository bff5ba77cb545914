//! Signature Requester - Off-chain KYC Attestation
//!
//! Builds the signing request from configuration and the current
//! session, enforces the client-side deadline, and checks that the
//! returned attestation is for the issuer and topic this tracker
//! trusts. Never touches chain state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::Address;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use crate::config::KycConfig;
use crate::domain::claim::SignedClaim;
use crate::domain::error::SigningError;
use crate::domain::identity::{IdentityAddress, WalletAddress};
use crate::ports::signing_service::{SignatureRequest, SigningService};

/// Default client-side deadline for the signing call.
pub const SIGNING_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SignatureRequester<S: SigningService> {
  service: Arc<S>,
  deadline: Duration,
  issuer: Address,
  topic: u64,
  claim_data: String,
  country_code: String,
}

impl<S: SigningService> SignatureRequester<S> {
  pub fn new(service: Arc<S>, kyc: &KycConfig, deadline: Duration) -> Self {
    Self {
      service,
      deadline,
      issuer: kyc.issuer_address,
      topic: kyc.topic,
      claim_data: kyc.claim_data.clone(),
      country_code: kyc.country_code.clone(),
    }
  }

  fn build(&self, wallet: WalletAddress, identity: IdentityAddress) -> SignatureRequest {
    SignatureRequest {
      user_address: wallet,
      identity_address: identity,
      claim_data: self.claim_data.clone(),
      topic: self.topic,
      country_code: self.country_code.clone(),
    }
  }

  /// Request an attestation for `identity`.
  ///
  /// Returns `SigningError::Timeout` when the service does not answer
  /// within the deadline.
  #[instrument(skip(self))]
  pub async fn request(
    &self,
    wallet: WalletAddress,
    identity: IdentityAddress,
  ) -> Result<SignedClaim, SigningError> {
    let request = self.build(wallet, identity);
    let started = Instant::now();

    let claim = match timeout(self.deadline, self.service.request_signature(&request)).await {
      Ok(result) => result?,
      Err(_) => {
        warn!(deadline_secs = self.deadline.as_secs(), "Signing request timed out");
        return Err(SigningError::Timeout);
      }
    };

    if claim.issuer != self.issuer {
      return Err(SigningError::Malformed(format!(
        "signed by {}, expected {}",
        claim.issuer, self.issuer
      )));
    }
    if claim.topic != self.topic {
      return Err(SigningError::Malformed(format!(
        "signed topic {}, expected {}",
        claim.topic, self.topic
      )));
    }

    info!(elapsed_ms = started.elapsed().as_millis(), "KYC signature obtained");
    Ok(claim)
  }
}
