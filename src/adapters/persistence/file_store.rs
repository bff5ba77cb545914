//! File Latch Store - Atomic JSON Latch Persistence
//!
//! Keeps every latch in `latches.json` as a flat object of
//! `key -> "true"`, the same layout the browser dashboard keeps in
//! local storage. Writes go to a temporary file first and are then
//! renamed over the original, so the file is always either the old or
//! the new version.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::ports::latch_store::LatchStore;

const LATCH_VALUE: &str = "true";

/// Atomic JSON latch store.
pub struct FileLatchStore {
    /// Path to latches.json.
    path: PathBuf,
    /// Temporary path for atomic writes.
    tmp_path: PathBuf,
    /// Serialises read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileLatchStore {
    /// Create a new latch store in the given data directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub async fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = data_dir.as_ref();
        fs::create_dir_all(dir)
            .await
            .context("Failed to create data directory")?;

        Ok(Self {
            path: dir.join("latches.json"),
            tmp_path: dir.join("latches.json.tmp"),
            write_lock: Mutex::new(()),
        })
    }

    async fn load(&self) -> Result<BTreeMap<String, String>> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(BTreeMap::new());
        }

        let json = fs::read_to_string(&self.path)
            .await
            .context("Failed to read latch file")?;

        serde_json::from_str(&json).context("Failed to parse latch JSON")
    }

    /// Rename an unreadable latch file out of the way so it is kept for
    /// inspection instead of being overwritten.
    async fn quarantine(&self) -> Result<PathBuf> {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let aside = self.path.with_file_name(format!("latches.json.corrupt-{stamp}"));
        fs::rename(&self.path, &aside)
            .await
            .context("Failed to move unreadable latch file aside")?;
        Ok(aside)
    }
}

#[async_trait]
impl LatchStore for FileLatchStore {
    async fn get(&self, key: &str) -> Result<bool> {
        let latches = self.load().await?;
        Ok(latches.get(key).is_some_and(|v| v == LATCH_VALUE))
    }

    #[instrument(skip(self))]
    async fn set(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut latches = match self.load().await {
            Ok(latches) => latches,
            Err(e) => {
                let aside = self.quarantine().await?;
                warn!(
                    error = %e,
                    moved_to = %aside.display(),
                    "Latch file unreadable, moved aside and starting fresh"
                );
                BTreeMap::new()
            }
        };

        if latches.get(key).is_some_and(|v| v == LATCH_VALUE) {
            debug!("Latch already set");
            return Ok(());
        }
        latches.insert(key.to_string(), LATCH_VALUE.to_string());

        let json = serde_json::to_string_pretty(&latches).context("Failed to serialize latches")?;

        // Write to tmp file
        fs::write(&self.tmp_path, &json)
            .await
            .context("Failed to write tmp latch file")?;

        // Atomic rename
        fs::rename(&self.tmp_path, &self.path)
            .await
            .context("Failed to rename latch file")?;

        info!(path = %self.path.display(), "Latch persisted");
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return true; // First run is OK
        }
        fs::metadata(&self.path).await.is_ok()
    }
}
