//! Engine configuration.
//!
//! Every filesystem location the engine touches is a field here. The config
//! is built once at startup and passed down; nothing reads the home
//! directory on its own.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vaultsync_backend::{GitBackendConfig, S3BackendConfig};

use crate::error::{EngineError, Result};

/// Default number of items prepared concurrently.
pub const DEFAULT_BATCH_SIZE: usize = 10;

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// Which transport holds the encrypted payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// No backend chosen yet.
    #[default]
    None,
    Git(GitBackendConfig),
    S3(S3BackendConfig),
}

/// Configuration for a [`crate::SyncEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Root of the local artifacts (`~/.claude`).
    pub claude_dir: PathBuf,
    /// Sync state document.
    pub state_path: PathBuf,
    /// Encryption key file (32 raw bytes or 64 hex chars).
    pub key_path: PathBuf,
    /// Items prepared concurrently during push and conflict detection.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub backend: BackendConfig,
}

impl SyncConfig {
    /// Default layout under a home directory, with no backend.
    pub fn from_home(home: impl AsRef<Path>) -> Self {
        let home = home.as_ref();
        let data_dir = home.join(".vaultsync");
        Self {
            claude_dir: home.join(".claude"),
            state_path: data_dir.join("state.json"),
            key_path: data_dir.join("key"),
            batch_size: DEFAULT_BATCH_SIZE,
            backend: BackendConfig::None,
        }
    }

    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EngineError::Config("batch_size must be at least 1".to_string()));
        }
        Ok(())
    }
}
