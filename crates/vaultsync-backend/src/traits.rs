//! Backend trait: the abstract interface for remote payload storage.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use vaultsync_core::{RemoteResourceDescriptor, ResourceType, TypeMetadata};
use vaultsync_crypto::looks_encrypted;

use crate::error::{BackendError, Result};

/// Concurrency of the default [`Backend::pull_many`].
pub const PULL_CONCURRENCY: usize = 8;

/// One payload handed to [`Backend::push_many`].
#[derive(Debug, Clone)]
pub struct PushItem {
    pub id: String,
    pub ciphertext: Vec<u8>,
    pub metadata: TypeMetadata,
}

/// A per-item failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemError {
    pub id: String,
    pub error: String,
}

impl ItemError {
    pub fn new(id: impl Into<String>, error: impl ToString) -> Self {
        Self {
            id: id.into(),
            error: error.to_string(),
        }
    }
}

/// Outcome of a bulk push. Every submitted id lands in exactly one list.
#[derive(Debug, Clone, Default)]
pub struct PushManyResult {
    pub pushed: Vec<String>,
    pub failed: Vec<ItemError>,
}

impl PushManyResult {
    pub fn pushed_count(&self) -> usize {
        self.pushed.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

/// Progress of a bulk push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushProgress {
    pub completed: usize,
    pub total: usize,
}

/// Progress callback for [`Backend::push_many`].
///
/// The lifetime lets a callback borrow local state, such as a progress bar.
pub type ProgressFn<'a> = dyn Fn(PushProgress) + Send + Sync + 'a;

/// Refuse anything that is not an encrypted envelope.
pub fn ensure_encrypted(id: &str, bytes: &[u8]) -> Result<()> {
    if looks_encrypted(bytes) {
        Ok(())
    } else {
        tracing::error!(id, "blocked push of unencrypted payload");
        Err(BackendError::SecurityViolation(id.to_string()))
    }
}

/// Remote storage for encrypted payloads.
///
/// # Design Notes
///
/// - **Push gate**: implementations call [`ensure_encrypted`] on every
///   payload before writing it.
/// - **No silent drops**: `push_many` reports every submitted id as either
///   pushed or failed. Internally it may batch or parallelize freely.
/// - **Listing is truth**: `list_all` reflects what exists remotely; it
///   always reports `exists_locally = false`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Store one payload. A security violation fails the whole call.
    async fn push_one(
        &self,
        resource_type: ResourceType,
        id: &str,
        ciphertext: &[u8],
        metadata: &TypeMetadata,
    ) -> Result<()>;

    /// Store many payloads, amortizing the transport round-trip.
    async fn push_many(
        &self,
        resource_type: ResourceType,
        items: Vec<PushItem>,
        progress: Option<&ProgressFn<'_>>,
    ) -> Result<PushManyResult>;

    /// Fetch one payload; `NotFound` if absent remotely.
    async fn pull_one(&self, resource_type: ResourceType, id: &str) -> Result<Vec<u8>>;

    /// Fetch several payloads with bounded concurrency. Results are unordered.
    async fn pull_many(
        &self,
        resource_type: ResourceType,
        ids: &[String],
    ) -> Vec<(String, Result<Vec<u8>>)> {
        stream::iter(ids.iter().cloned())
            .map(|id| async move {
                let result = self.pull_one(resource_type, &id).await;
                (id, result)
            })
            .buffer_unordered(PULL_CONCURRENCY)
            .collect()
            .await
    }

    /// List every object of a type.
    async fn list_all(&self, resource_type: ResourceType) -> Result<Vec<RemoteResourceDescriptor>>;

    /// Remove one object.
    async fn delete_one(&self, resource_type: ResourceType, id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultsync_crypto::{ChaChaCipher, Cipher, EncryptionKey};

    #[test]
    fn test_gate_blocks_plaintext() {
        let err = ensure_encrypted("web/1", br#"{"type":"user"}"#).unwrap_err();
        assert!(matches!(err, BackendError::SecurityViolation(ref id) if id == "web/1"));
    }

    #[test]
    fn test_gate_passes_sealed_payload() {
        let cipher = ChaChaCipher::new(EncryptionKey::generate());
        let sealed = cipher.encrypt(b"line").unwrap();
        assert!(ensure_encrypted("web/1", &sealed).is_ok());
    }
}
