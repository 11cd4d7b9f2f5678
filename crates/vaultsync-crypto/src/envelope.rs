//! Encrypted payload envelope.
//!
//! Every payload pushed to a backend is an `EncryptedPayload` serialized as
//! CBOR. The envelope carries the metadata needed to open it (assuming the
//! holder has the key).

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, Result};
use crate::key::{EncryptionKey, EncryptionNonce};

/// Format identifier for encrypted payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EncryptionFormat {
    /// ChaCha20-Poly1305 with 256-bit key.
    ChaCha20Poly1305 = 1,
}

/// An encrypted payload envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    /// Encryption algorithm used.
    pub format: EncryptionFormat,

    /// Nonce used for encryption (unique per encryption).
    pub nonce: EncryptionNonce,

    /// The encrypted data (includes authentication tag).
    pub ciphertext: Bytes,
}

impl EncryptedPayload {
    /// Encrypt plaintext with the given key under a fresh nonce.
    pub fn encrypt(plaintext: &[u8], key: &EncryptionKey) -> Result<Self> {
        let nonce = EncryptionNonce::generate();
        let ciphertext = key.encrypt(plaintext, &nonce)?;

        Ok(Self {
            format: EncryptionFormat::ChaCha20Poly1305,
            nonce,
            ciphertext: Bytes::from(ciphertext),
        })
    }

    /// Decrypt with the given key.
    pub fn decrypt(&self, key: &EncryptionKey) -> Result<Vec<u8>> {
        match self.format {
            EncryptionFormat::ChaCha20Poly1305 => key.decrypt(&self.ciphertext, &self.nonce),
        }
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.ciphertext.len() + 64);
        ciborium::into_writer(self, &mut buf).map_err(|e| CryptoError::Envelope(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| CryptoError::Envelope(e.to_string()))
    }
}

/// CBOR header byte of a map with three entries.
const ENVELOPE_HEADER: u8 = 0xa3;

/// Check whether bytes look like an encrypted envelope.
///
/// Cheap header check first, then a full structural parse. This is a
/// heuristic: it proves the bytes are an envelope, not that they decrypt.
pub fn looks_encrypted(bytes: &[u8]) -> bool {
    if bytes.first() != Some(&ENVELOPE_HEADER) {
        return false;
    }
    EncryptedPayload::from_bytes(bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = EncryptionKey::generate();
        let plaintext = b"hello, encrypted world!";

        let envelope = EncryptedPayload::encrypt(plaintext, &key).unwrap();
        let decrypted = envelope.decrypt(&key).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_envelope_serialization() {
        let key = EncryptionKey::generate();
        let envelope = EncryptedPayload::encrypt(b"test", &key).unwrap();

        let bytes = envelope.to_bytes().unwrap();
        assert_eq!(bytes[0], ENVELOPE_HEADER);
        let recovered = EncryptedPayload::from_bytes(&bytes).unwrap();

        assert_eq!(envelope, recovered);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = EncryptionKey::generate();
        let key2 = EncryptionKey::generate();

        let envelope = EncryptedPayload::encrypt(b"secret", &key1).unwrap();

        assert!(envelope.decrypt(&key2).is_err());
    }

    #[test]
    fn test_plain_documents_do_not_look_encrypted() {
        assert!(!looks_encrypted(b""));
        assert!(!looks_encrypted(br#"{"type":"user","message":"hi"}"#));
        assert!(!looks_encrypted(b"[1,2,3]"));
        assert!(!looks_encrypted(b"# Reviewer agent\n"));
        // Right header byte, wrong structure.
        assert!(!looks_encrypted(&[0xa3, 0x00, 0x01]));
    }

    #[test]
    fn test_sealed_payload_looks_encrypted() {
        let key = EncryptionKey::generate();
        let bytes = EncryptedPayload::encrypt(br#"{"a":1}"#, &key)
            .unwrap()
            .to_bytes()
            .unwrap();
        assert!(looks_encrypted(&bytes));
    }
}
