//! JSON-file implementation of the StateStore trait.
//!
//! This is the durable store. The document is rewritten whole on every
//! save through a temp file in the same directory followed by a rename, so
//! a crash leaves either the old or the new document, never a torn one.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::{Result, StateError};
use crate::model::{SyncState, SyncUpdate};
use crate::traits::StateStore;

/// Sync state persisted as a JSON document.
pub struct JsonStateStore {
    path: PathBuf,
    /// Serializes every load/save against this file.
    lock: Mutex<()>,
}

impl JsonStateStore {
    /// Use the document at `path`. Nothing is touched until the first call.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_state(&self) -> SyncState {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return SyncState::empty(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "sync state unreadable, starting empty");
                return SyncState::empty();
            }
        };

        match SyncState::from_slice(&bytes) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "sync state corrupt, starting empty");
                SyncState::empty()
            }
        }
    }

    async fn write_state(&self, state: &SyncState) -> Result<()> {
        let mut json = serde_json::to_vec_pretty(state)?;
        json.push(b'\n');
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&path, &json))
            .await
            .map_err(|e| StateError::Task(e.to_string()))?
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StateError::Io(e.error))?;
    Ok(())
}

#[async_trait]
impl StateStore for JsonStateStore {
    async fn load(&self) -> SyncState {
        let _guard = self.lock.lock().await;
        self.read_state().await
    }

    async fn save(&self, state: &SyncState) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.write_state(state).await
    }

    async fn update_batch(&self, updates: &[SyncUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let _guard = self.lock.lock().await;
        let mut state = self.read_state().await;
        state.apply(updates, Utc::now());
        self.write_state(&state).await?;
        tracing::debug!(count = updates.len(), "sync state updated");
        Ok(())
    }
}
