//! Claim Writer - `addClaim` Submission
//!
//! The only component that mutates the identity contract. Submits the
//! attestation, tracks its receipt through the `TransactionMonitor` and
//! publishes every status change on a `watch` channel. It never
//! resubmits on its own.

use std::sync::Arc;

use alloy::primitives::TxHash;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, instrument};

use super::transaction_monitor::{TransactionMonitor, TxOutcome};
use crate::domain::claim::SignedClaim;
use crate::domain::error::StepError;
use crate::domain::identity::IdentityAddress;
use crate::ports::chain_client::{ClaimSubmission, IdentityChain};

/// Lifecycle of the latest claim transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClaimWriteStatus {
  #[default]
  Idle,
  /// Submission sent, hash not yet known.
  Pending,
  Confirming { tx_hash: TxHash },
  Confirmed { tx_hash: TxHash, block: Option<u64> },
  Reverted { tx_hash: TxHash },
  Failed { message: String },
}

pub struct ClaimWriter<C: IdentityChain> {
  chain: Arc<C>,
  monitor: Arc<TransactionMonitor<C>>,
  scheme: u64,
  status: watch::Sender<ClaimWriteStatus>,
}

impl<C: IdentityChain> ClaimWriter<C> {
  pub fn new(chain: Arc<C>, monitor: Arc<TransactionMonitor<C>>, scheme: u64) -> Self {
    let (status, _) = watch::channel(ClaimWriteStatus::Idle);
    Self {
      chain,
      monitor,
      scheme,
      status,
    }
  }

  pub fn subscribe(&self) -> watch::Receiver<ClaimWriteStatus> {
    self.status.subscribe()
  }

  pub fn status(&self) -> ClaimWriteStatus {
    self.status.borrow().clone()
  }

  /// Forget the previous transaction, e.g. on wallet change.
  pub fn reset(&self) {
    self.status.send_replace(ClaimWriteStatus::Idle);
  }

  /// Send `addClaim` to `identity` and return the transaction hash.
  #[instrument(skip(self, claim), fields(issuer = %claim.issuer, topic = claim.topic))]
  pub async fn submit(
    &self,
    identity: IdentityAddress,
    claim: &SignedClaim,
  ) -> Result<TxHash, StepError> {
    self.status.send_replace(ClaimWriteStatus::Pending);
    let submission = ClaimSubmission::from_signed(claim, self.scheme);

    match self.chain.add_claim(identity, &submission).await {
      Ok(tx_hash) => {
        info!(tx = %tx_hash, "addClaim submitted");
        self
          .status
          .send_replace(ClaimWriteStatus::Confirming { tx_hash });
        Ok(tx_hash)
      }
      Err(e) => {
        let message = format!("{e:#}");
        error!(error = %message, "addClaim submission failed");
        self.status.send_replace(ClaimWriteStatus::Failed {
          message: message.clone(),
        });
        Err(StepError::Transaction(message))
      }
    }
  }

  /// Wait for the submitted transaction to be mined.
  ///
  /// A mined, successful receipt only means the write landed; whether
  /// the claim is valid is decided by a subsequent claim read.
  #[instrument(skip(self))]
  pub async fn await_confirmation(&self, tx_hash: TxHash) -> Result<Option<u64>, StepError> {
    match self.monitor.wait(tx_hash).await {
      Ok(TxOutcome::Confirmed { block }) => {
        self
          .status
          .send_replace(ClaimWriteStatus::Confirmed { tx_hash, block });
        Ok(block)
      }
      Ok(TxOutcome::Reverted) => {
        self
          .status
          .send_replace(ClaimWriteStatus::Reverted { tx_hash });
        Err(StepError::Reverted { tx_hash })
      }
      Err(e) => {
        self.status.send_replace(ClaimWriteStatus::Failed {
          message: e.to_string(),
        });
        Err(e)
      }
    }
  }
}
