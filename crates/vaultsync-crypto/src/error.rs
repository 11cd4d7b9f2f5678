//! Error types for the crypto module.

use thiserror::Error;

/// Errors that can occur while sealing or opening payloads.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption error.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Wrong key or tampered ciphertext.
    #[error("decryption error: {0}")]
    Decryption(String),

    /// Envelope could not be encoded or decoded.
    #[error("envelope error: {0}")]
    Envelope(String),

    /// Key material is missing or malformed.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// I/O error while reading key material.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
