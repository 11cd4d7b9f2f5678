//! Error types for the sync engine.

use thiserror::Error;
use vaultsync_backend::BackendError;
use vaultsync_core::{CoreError, ResourceType};
use vaultsync_crypto::CryptoError;
use vaultsync_resources::ResourceError;
use vaultsync_state::StateError;

/// Errors that abort a sync operation.
///
/// Per-item failures never surface here; they are collected in the
/// operation's report.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Setup is incomplete (no key, no backend). Nothing was transferred.
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// The configuration file is unreadable or invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A resource named with `only` does not exist.
    #[error("no {resource_type} named {id}")]
    UnknownResource {
        resource_type: ResourceType,
        id: String,
    },

    /// No handler is registered for the type.
    #[error("no handler registered for {0}")]
    NoHandler(ResourceType),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
