//! # vaultsync Crypto
//!
//! Client-side authenticated encryption for everything that leaves the
//! machine.
//!
//! ## Overview
//!
//! Payloads are sealed with ChaCha20-Poly1305 under a single locally held
//! 256-bit key and wrapped in a CBOR [`EncryptedPayload`] envelope that
//! records the format and the per-message nonce. Tampering or a wrong key
//! surfaces as [`CryptoError::Decryption`].
//!
//! The engine only sees the [`Cipher`] trait, so tests can substitute a
//! cipher that fails on demand.
//!
//! ## Usage
//!
//! ```rust
//! use vaultsync_crypto::{ChaChaCipher, Cipher, EncryptionKey};
//!
//! let cipher = ChaChaCipher::new(EncryptionKey::generate());
//! let sealed = cipher.encrypt(b"{\"model\":\"opus\"}").unwrap();
//! assert!(cipher.looks_encrypted(&sealed));
//! assert_eq!(cipher.decrypt(&sealed).unwrap(), b"{\"model\":\"opus\"}");
//! ```
//!
//! ## Push Gate
//!
//! [`looks_encrypted`] is the heuristic every backend runs before writing:
//! only bytes that parse as a known-format envelope pass. A raw JSON or
//! text document never does.

pub mod cipher;
pub mod envelope;
pub mod error;
pub mod key;

pub use cipher::{ChaChaCipher, Cipher};
pub use envelope::{looks_encrypted, EncryptedPayload, EncryptionFormat};
pub use error::{CryptoError, Result};
pub use key::{EncryptionKey, EncryptionNonce};
