//! Error types for the backend module.

use thiserror::Error;
use vaultsync_core::{CoreError, ResourceType};

/// Errors that can occur during backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The object does not exist remotely.
    #[error("{resource_type} {id} not found on remote")]
    NotFound {
        resource_type: ResourceType,
        id: String,
    },

    /// Refused to push bytes that do not look encrypted. Never retried.
    #[error("refusing to push unencrypted payload for {0}")]
    SecurityViolation(String),

    /// Transport-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote refused the update because it moved on. Integrating the
    /// remote history and retrying resolves it.
    #[error("push rejected: {0}")]
    Rejected(String),

    /// Error from libgit2.
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// Error from the S3 client.
    #[error("s3 error: {0}")]
    S3(String),

    /// Remote key could not be mapped back to an id.
    #[error("invalid remote key: {0}")]
    Key(#[from] CoreError),

    /// Backend is missing required setup.
    #[error("backend not configured: {0}")]
    NotConfigured(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking task failed to complete.
    #[error("backend task failed: {0}")]
    Task(String),
}

impl BackendError {
    pub fn not_found(resource_type: ResourceType, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;
