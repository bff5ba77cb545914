//! Identity Reader - Wallet to OnchainID Lookup
//!
//! Resolves the identity contract bound to a wallet through the
//! factory. The zero address is normalised to `None` here so nothing
//! downstream ever sees it.

use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use tracing::{debug, instrument};

use super::backoff::ReadBackoff;
use crate::domain::identity::{identity_from_lookup, IdentityAddress, WalletAddress};
use crate::ports::chain_client::IdentityChain;

/// Factory lookups, with a settling variant for use after deployment.
pub struct IdentityReader<C: IdentityChain> {
  chain: Arc<C>,
  backoff: ReadBackoff,
}

impl<C: IdentityChain> IdentityReader<C> {
  pub fn new(chain: Arc<C>, backoff: ReadBackoff) -> Self {
    Self { chain, backoff }
  }

  /// Single factory read.
  #[instrument(skip(self))]
  pub async fn read(&self, wallet: WalletAddress) -> Result<Option<IdentityAddress>> {
    let raw: Address = self
      .chain
      .get_identity(wallet)
      .await
      .context("getIdentity failed")?;
    debug!(identity = %raw, "Factory lookup");
    Ok(identity_from_lookup(raw))
  }

  /// Re-read until the factory reports an identity, using the backoff
  /// schedule. Call only after a deployment has confirmed.
  #[instrument(skip(self))]
  pub async fn read_after_write(&self, wallet: WalletAddress) -> Option<IdentityAddress> {
    self.backoff.settle("identity", || self.read(wallet)).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::claim::ClaimRecord;
  use crate::ports::chain_client::{ClaimSubmission, TxReceipt};
  use alloy::primitives::{address, TxHash, B256};
  use async_trait::async_trait;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::time::Duration;

  const WALLET: Address = address!("1111111111111111111111111111111111111111");
  const IDENTITY: Address = address!("2222222222222222222222222222222222222222");

  /// Factory that reports zero for the first `lag` lookups.
  struct LaggingFactory {
    lag: usize,
    calls: AtomicUsize,
  }

  #[async_trait]
  impl IdentityChain for LaggingFactory {
    async fn get_identity(&self, _wallet: Address) -> Result<Address> {
      let n = self.calls.fetch_add(1, Ordering::SeqCst);
      Ok(if n < self.lag { Address::ZERO } else { IDENTITY })
    }
    async fn get_claim(&self, _identity: Address, _id: B256) -> Result<ClaimRecord> {
      Ok(ClaimRecord::default())
    }
    async fn deploy_identity(&self, _wallet: Address) -> Result<TxHash> {
      anyhow::bail!("unused")
    }
    async fn add_claim(&self, _identity: Address, _s: &ClaimSubmission) -> Result<TxHash> {
      anyhow::bail!("unused")
    }
    async fn transaction_receipt(&self, _tx: TxHash) -> Result<Option<TxReceipt>> {
      Ok(None)
    }
    async fn is_healthy(&self) -> bool {
      true
    }
  }

  fn reader(lag: usize) -> IdentityReader<LaggingFactory> {
    let backoff = ReadBackoff {
      initial_delay: Duration::from_millis(100),
      multiplier: 2,
      max_delay: Duration::from_secs(1),
      max_attempts: 3,
    };
    IdentityReader::new(
      Arc::new(LaggingFactory {
        lag,
        calls: AtomicUsize::new(0),
      }),
      backoff,
    )
  }

  #[tokio::test]
  async fn test_zero_address_reads_as_none() {
    assert_eq!(reader(1).read(WALLET).await.unwrap(), None);
  }

  #[tokio::test(start_paused = true)]
  async fn test_read_after_write_waits_out_lag() {
    assert_eq!(reader(2).read_after_write(WALLET).await, Some(IDENTITY));
  }

  #[tokio::test(start_paused = true)]
  async fn test_read_after_write_gives_up() {
    assert_eq!(reader(10).read_after_write(WALLET).await, None);
  }
}
