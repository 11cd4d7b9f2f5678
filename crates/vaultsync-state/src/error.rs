//! Error types for the state store.

use thiserror::Error;

/// Errors that can occur during state store operations.
#[derive(Debug, Error)]
pub enum StateError {
    /// Persisted state is unreadable or structurally invalid.
    ///
    /// `load` recovers from this by returning the empty state; it only
    /// surfaces from the lower-level parse helpers.
    #[error("corrupt sync state: {0}")]
    Corrupt(String),

    /// State could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking write task failed to complete.
    #[error("state write task failed: {0}")]
    Task(String),
}

/// Result type for state store operations.
pub type Result<T> = std::result::Result<T, StateError>;
