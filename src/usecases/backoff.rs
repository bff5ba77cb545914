//! Read-after-write Backoff
//!
//! The RPC node that accepted a transaction is not necessarily the one
//! answering the next `eth_call`, so a read issued right after a
//! confirmed write can still see the old state. Instead of sleeping a
//! fixed interval and trusting a single read, reads are repeated with
//! exponentially growing delays until they reflect the write or the
//! attempt budget runs out.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::SettlementConfig;

/// Exponential backoff schedule for settlement reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadBackoff {
  /// Delay before the first read.
  pub initial_delay: Duration,
  /// Factor applied after each attempt.
  pub multiplier: u32,
  /// Upper bound for a single delay.
  pub max_delay: Duration,
  /// Number of reads before giving up.
  pub max_attempts: u32,
}

impl Default for ReadBackoff {
  fn default() -> Self {
    Self::from(&SettlementConfig::default())
  }
}

impl From<&SettlementConfig> for ReadBackoff {
  fn from(config: &SettlementConfig) -> Self {
    Self {
      initial_delay: Duration::from_millis(config.initial_delay_ms),
      multiplier: config.multiplier.max(1),
      max_delay: Duration::from_millis(config.max_delay_ms),
      max_attempts: config.max_attempts.max(1),
    }
  }
}

impl ReadBackoff {
  /// Delay before attempt `attempt` (zero-based).
  pub fn delay(&self, attempt: u32) -> Duration {
    let factor = self.multiplier.saturating_pow(attempt);
    self.initial_delay.saturating_mul(factor).min(self.max_delay)
  }

  /// Total time spent sleeping when every attempt is used.
  pub fn total_budget(&self) -> Duration {
    (0..self.max_attempts).map(|a| self.delay(a)).sum()
  }

  /// Repeat `read` until it yields `Some`, sleeping before each attempt.
  ///
  /// Read errors are logged and count as a failed attempt. Returns
  /// `None` once the attempt budget is exhausted.
  pub async fn settle<T, E, F, Fut>(&self, what: &'static str, mut read: F) -> Option<T>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    E: std::fmt::Display,
  {
    for attempt in 0..self.max_attempts {
      let delay = self.delay(attempt);
      debug!(what, attempt, delay_ms = delay.as_millis(), "Waiting before settlement read");
      sleep(delay).await;

      match read().await {
        Ok(Some(value)) => return Some(value),
        Ok(None) => debug!(what, attempt, "Write not yet visible"),
        Err(e) => warn!(what, attempt, error = %e, "Settlement read failed"),
      }
    }

    warn!(what, attempts = self.max_attempts, "Write never became visible");
    None
  }
}
