//! Error types for vaultsync core.

use thiserror::Error;

/// Errors raised by the pure core primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("malformed escape sequence in remote id: {0}")]
    MalformedEscape(String),

    #[error("remote key {key} does not belong to prefix {prefix}")]
    ForeignKey { key: String, prefix: String },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
