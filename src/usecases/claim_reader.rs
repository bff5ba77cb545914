//! Claim Reader - KYC Claim Lookup and Validation
//!
//! Reads the claim stored under `claim_id(issuer, topic)` on an
//! identity contract and classifies it against the trusted issuer.
//! This is the only source of truth for "KYC complete".

use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, B256};
use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use super::backoff::ReadBackoff;
use crate::domain::claim::{claim_id, classify, ClaimStatus};
use crate::domain::identity::IdentityAddress;
use crate::ports::chain_client::IdentityChain;

pub struct ClaimReader<C: IdentityChain> {
  chain: Arc<C>,
  issuer: Address,
  topic: u64,
  claim_id: B256,
  backoff: ReadBackoff,
}

impl<C: IdentityChain> ClaimReader<C> {
  pub fn new(chain: Arc<C>, issuer: Address, topic: u64, backoff: ReadBackoff) -> Self {
    Self {
      chain,
      issuer,
      topic,
      claim_id: claim_id(issuer, topic),
      backoff,
    }
  }

  /// Claim id queried on every identity.
  pub const fn claim_id(&self) -> B256 {
    self.claim_id
  }

  /// Single `getClaim` read, classified.
  #[instrument(skip(self))]
  pub async fn read(&self, identity: IdentityAddress) -> Result<ClaimStatus> {
    let record = self
      .chain
      .get_claim(identity, self.claim_id)
      .await
      .context("getClaim failed")?;
    let status = classify(&record, self.issuer, self.topic);
    if let ClaimStatus::Mismatch(reason) = &status {
      info!(?reason, "Claim present but not trusted");
    }
    debug!(valid = status.is_valid(), "Claim read");
    Ok(status)
  }

  /// Re-read until a valid claim shows up, using the backoff schedule.
  ///
  /// Returns the last observed status; `Absent` if every read failed.
  #[instrument(skip(self))]
  pub async fn confirm_after_write(&self, identity: IdentityAddress) -> ClaimStatus {
    let last = Mutex::new(ClaimStatus::Absent);
    let confirmed = self
      .backoff
      .settle("claim", || {
        let last = &last;
        async move {
          let status = self.read(identity).await?;
          if status.is_valid() {
            return Ok::<_, anyhow::Error>(Some(status));
          }
          if let Ok(mut slot) = last.lock() {
            *slot = status;
          }
          Ok(None)
        }
      })
      .await;
    confirmed.unwrap_or_else(|| {
      last
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
    })
  }
}
