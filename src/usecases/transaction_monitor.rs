//! Transaction Monitor - Receipt Polling
//!
//! Polls `eth_getTransactionReceipt` at a fixed interval until the
//! transaction is mined or the deadline passes. Receipt lookup errors
//! are treated as transient and polled through.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::TxHash;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::domain::error::StepError;
use crate::ports::chain_client::IdentityChain;

/// Final outcome of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
  Confirmed { block: Option<u64> },
  Reverted,
}

pub struct TransactionMonitor<C: IdentityChain> {
  chain: Arc<C>,
  poll_interval: Duration,
  deadline: Duration,
}

impl<C: IdentityChain> TransactionMonitor<C> {
  pub fn new(chain: Arc<C>, poll_interval: Duration, deadline: Duration) -> Self {
    Self {
      chain,
      poll_interval,
      deadline,
    }
  }

  /// Wait for `tx_hash` to be mined.
  ///
  /// Fails with `StepError::Transaction` if no receipt shows up before
  /// the deadline.
  #[instrument(skip(self))]
  pub async fn wait(&self, tx_hash: TxHash) -> Result<TxOutcome, StepError> {
    // A deadline past the clock's range means no deadline.
    let give_up_at = Instant::now().checked_add(self.deadline);
    let mut ticker = interval(self.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
      ticker.tick().await;

      match self.chain.transaction_receipt(tx_hash).await {
        Ok(Some(receipt)) if receipt.success => {
          info!(block = ?receipt.block_number, "Transaction confirmed");
          return Ok(TxOutcome::Confirmed {
            block: receipt.block_number,
          });
        }
        Ok(Some(_)) => {
          warn!("Transaction reverted");
          return Ok(TxOutcome::Reverted);
        }
        Ok(None) => debug!("Receipt not yet available"),
        Err(e) => warn!(error = %e, "Receipt lookup failed"),
      }

      if give_up_at.is_some_and(|at| Instant::now() >= at) {
        warn!(deadline_secs = self.deadline.as_secs(), "Gave up waiting for receipt");
        return Err(StepError::Transaction(format!(
          "no receipt for {tx_hash} after {}s",
          self.deadline.as_secs()
        )));
      }
    }
  }
}
