//! In-memory Latch Store
//!
//! Process-local latches. Used by tests and when the tracker runs
//! without a data directory.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::ports::latch_store::LatchStore;

/// Latches held in a `HashSet` of set keys.
#[derive(Debug, Default)]
pub struct MemoryLatchStore {
    keys: RwLock<HashSet<String>>,
}

impl MemoryLatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate latches, e.g. to simulate a returning user.
    pub fn with_keys<I: IntoIterator<Item = String>>(keys: I) -> Self {
        Self {
            keys: RwLock::new(keys.into_iter().collect()),
        }
    }
}

#[async_trait]
impl LatchStore for MemoryLatchStore {
    async fn get(&self, key: &str) -> Result<bool> {
        Ok(self.keys.read().await.contains(key))
    }

    async fn set(&self, key: &str) -> Result<()> {
        self.keys.write().await.insert(key.to_string());
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}
