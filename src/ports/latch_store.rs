//! Latch Store Port - Durable Per-wallet Flags
//!
//! A latch is a monotonic flag: `set` may be called any number of
//! times and always writes the same value, so concurrent writers need
//! no coordination. Nothing in this crate clears a latch.

use async_trait::async_trait;

/// Trait for latch persistence providers.
#[async_trait]
pub trait LatchStore: Send + Sync + 'static {
  /// Whether the latch under `key` has been set.
  async fn get(&self, key: &str) -> anyhow::Result<bool>;

  /// Set the latch under `key`.
  async fn set(&self, key: &str) -> anyhow::Result<()>;

  /// Check if the backing storage is usable.
  async fn is_healthy(&self) -> bool;
}
