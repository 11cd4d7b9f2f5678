//! The encryption collaborator seen by the sync engine.

use crate::envelope::{looks_encrypted, EncryptedPayload};
use crate::error::Result;
use crate::key::EncryptionKey;

/// Seals and opens payloads with a locally held secret.
///
/// Implementations must be authenticated: `decrypt` fails on a wrong key
/// or any modification of the sealed bytes.
pub trait Cipher: Send + Sync {
    /// Seal a payload. Empty input is valid.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Open a sealed payload.
    fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>>;

    /// Push gate: does `bytes` look like output of [`Cipher::encrypt`]?
    fn looks_encrypted(&self, bytes: &[u8]) -> bool {
        looks_encrypted(bytes)
    }
}

/// ChaCha20-Poly1305 cipher using the CBOR envelope.
#[derive(Debug, Clone)]
pub struct ChaChaCipher {
    key: EncryptionKey,
}

impl ChaChaCipher {
    pub fn new(key: EncryptionKey) -> Self {
        Self { key }
    }
}

impl Cipher for ChaChaCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        EncryptedPayload::encrypt(plaintext, &self.key)?.to_bytes()
    }

    fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        EncryptedPayload::from_bytes(sealed)?.decrypt(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CryptoError;
    use proptest::prelude::*;

    fn cipher() -> ChaChaCipher {
        ChaChaCipher::new(EncryptionKey::from_bytes([7u8; 32]))
    }

    #[test]
    fn test_empty_payload_roundtrip() {
        let c = cipher();
        let sealed = c.encrypt(b"").unwrap();
        assert!(c.looks_encrypted(&sealed));
        assert_eq!(c.decrypt(&sealed).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_same_plaintext_seals_differently() {
        let c = cipher();
        assert_ne!(c.encrypt(b"same").unwrap(), c.encrypt(b"same").unwrap());
    }

    #[test]
    fn test_tampered_ciphertext_is_rejected() {
        let c = cipher();
        let sealed = c.encrypt(b"transcript line").unwrap();
        let mut envelope = EncryptedPayload::from_bytes(&sealed).unwrap();
        let mut body = envelope.ciphertext.to_vec();
        body[0] ^= 0x01;
        envelope.ciphertext = body.into();
        let tampered = envelope.to_bytes().unwrap();

        assert!(matches!(c.decrypt(&tampered), Err(CryptoError::Decryption(_))));
    }

    #[test]
    fn test_plaintext_is_not_decryptable() {
        let c = cipher();
        assert!(matches!(
            c.decrypt(br#"{"plain":true}"#),
            Err(CryptoError::Envelope(_))
        ));
    }

    proptest! {
        #[test]
        fn decrypt_inverts_encrypt(data in prop::collection::vec(any::<u8>(), 0..2048)) {
            let c = cipher();
            let sealed = c.encrypt(&data).unwrap();
            prop_assert!(c.looks_encrypted(&sealed));
            prop_assert_eq!(c.decrypt(&sealed).unwrap(), data);
        }
    }
}
