//! In-memory implementation of the Backend trait.
//!
//! Primarily for testing. Objects are stored under the same keys a real
//! backend would use, so key escaping is exercised end to end. Transfers can
//! be made to fail per id to simulate transport errors.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use vaultsync_core::{
    id_from_remote_key, remote_key, RemoteResourceDescriptor, ResourceType, TypeMetadata,
};

use crate::error::{BackendError, Result};
use crate::traits::{ensure_encrypted, Backend, ItemError, ProgressFn, PushItem, PushManyResult, PushProgress};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    metadata: TypeMetadata,
}

#[derive(Default)]
struct MemoryBackendInner {
    /// Remote key → object.
    objects: BTreeMap<String, StoredObject>,
    failing_pushes: HashSet<String>,
    failing_pulls: HashSet<String>,
    push_many_calls: usize,
}

/// In-memory backend.
#[derive(Default)]
pub struct MemoryBackend {
    inner: RwLock<MemoryBackendInner>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every push of `id` fail with a transport error.
    pub async fn fail_pushes_for(&self, id: impl Into<String>) {
        self.inner.write().await.failing_pushes.insert(id.into());
    }

    /// Make every pull of `id` fail with a transport error.
    pub async fn fail_pulls_for(&self, id: impl Into<String>) {
        self.inner.write().await.failing_pulls.insert(id.into());
    }

    /// How many times `push_many` has been called.
    pub async fn push_many_calls(&self) -> usize {
        self.inner.read().await.push_many_calls
    }

    /// Raw stored bytes for an object, if present.
    pub async fn object(&self, resource_type: ResourceType, id: &str) -> Option<Vec<u8>> {
        self.inner
            .read()
            .await
            .objects
            .get(&remote_key(resource_type, id))
            .map(|o| o.bytes.clone())
    }

    /// Number of stored objects across all types.
    pub async fn len(&self) -> usize {
        self.inner.read().await.objects.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn store(
        inner: &mut MemoryBackendInner,
        resource_type: ResourceType,
        id: &str,
        ciphertext: &[u8],
        metadata: &TypeMetadata,
    ) -> Result<()> {
        ensure_encrypted(id, ciphertext)?;
        if inner.failing_pushes.contains(id) {
            return Err(BackendError::Transport(format!("simulated push failure for {id}")));
        }
        inner.objects.insert(
            remote_key(resource_type, id),
            StoredObject {
                bytes: ciphertext.to_vec(),
                metadata: metadata.clone(),
            },
        );
        Ok(())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn push_one(
        &self,
        resource_type: ResourceType,
        id: &str,
        ciphertext: &[u8],
        metadata: &TypeMetadata,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        Self::store(&mut inner, resource_type, id, ciphertext, metadata)
    }

    async fn push_many(
        &self,
        resource_type: ResourceType,
        items: Vec<PushItem>,
        progress: Option<&ProgressFn<'_>>,
    ) -> Result<PushManyResult> {
        let mut inner = self.inner.write().await;
        inner.push_many_calls += 1;

        let total = items.len();
        let mut result = PushManyResult::default();
        for (i, item) in items.into_iter().enumerate() {
            match Self::store(&mut inner, resource_type, &item.id, &item.ciphertext, &item.metadata) {
                Ok(()) => result.pushed.push(item.id),
                Err(e) => result.failed.push(ItemError::new(item.id, e)),
            }
            if let Some(progress) = progress {
                progress(PushProgress {
                    completed: i + 1,
                    total,
                });
            }
        }
        Ok(result)
    }

    async fn pull_one(&self, resource_type: ResourceType, id: &str) -> Result<Vec<u8>> {
        let inner = self.inner.read().await;
        if inner.failing_pulls.contains(id) {
            return Err(BackendError::Transport(format!("simulated pull failure for {id}")));
        }
        inner
            .objects
            .get(&remote_key(resource_type, id))
            .map(|o| o.bytes.clone())
            .ok_or_else(|| BackendError::not_found(resource_type, id))
    }

    async fn list_all(&self, resource_type: ResourceType) -> Result<Vec<RemoteResourceDescriptor>> {
        let inner = self.inner.read().await;
        let prefix = resource_type.config().storage_prefix;

        let mut descriptors = Vec::new();
        for (key, object) in inner.objects.range(prefix.to_string()..) {
            if !key.starts_with(prefix) {
                break;
            }
            if let Some(id) = id_from_remote_key(resource_type, key)? {
                let mut descriptor = RemoteResourceDescriptor::new(resource_type, id);
                descriptor.metadata = Some(object.metadata.clone());
                descriptors.push(descriptor);
            }
        }
        Ok(descriptors)
    }

    async fn delete_one(&self, resource_type: ResourceType, id: &str) -> Result<()> {
        self.inner
            .write()
            .await
            .objects
            .remove(&remote_key(resource_type, id))
            .map(|_| ())
            .ok_or_else(|| BackendError::not_found(resource_type, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vaultsync_crypto::{ChaChaCipher, Cipher, EncryptionKey};

    fn sealed(cipher: &ChaChaCipher, body: &str) -> Vec<u8> {
        cipher.encrypt(body.as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn test_push_pull_list_delete() {
        let backend = MemoryBackend::new();
        let cipher = ChaChaCipher::new(EncryptionKey::generate());
        let meta = TypeMetadata::project("web");

        backend
            .push_one(ResourceType::Sessions, "web/1", &sealed(&cipher, "a"), &meta)
            .await
            .unwrap();

        let listed = backend.list_all(ResourceType::Sessions).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "web/1");
        assert!(!listed[0].exists_locally);
        assert_eq!(listed[0].metadata.as_ref(), Some(&meta));
        assert!(backend.list_all(ResourceType::Agents).await.unwrap().is_empty());

        let bytes = backend.pull_one(ResourceType::Sessions, "web/1").await.unwrap();
        assert_eq!(cipher.decrypt(&bytes).unwrap(), b"a");

        backend.delete_one(ResourceType::Sessions, "web/1").await.unwrap();
        assert!(backend
            .pull_one(ResourceType::Sessions, "web/1")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_push_one_rejects_plaintext() {
        let backend = MemoryBackend::new();
        let err = backend
            .push_one(ResourceType::Agents, "a", b"# plain", &TypeMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::SecurityViolation(_)));
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_push_many_reports_every_item() {
        let backend = MemoryBackend::new();
        let cipher = ChaChaCipher::new(EncryptionKey::generate());
        backend.fail_pushes_for("b").await;

        let items = vec![
            PushItem { id: "a".into(), ciphertext: sealed(&cipher, "1"), metadata: TypeMetadata::default() },
            PushItem { id: "b".into(), ciphertext: sealed(&cipher, "2"), metadata: TypeMetadata::default() },
            PushItem { id: "c".into(), ciphertext: b"plain".to_vec(), metadata: TypeMetadata::default() },
            PushItem { id: "d".into(), ciphertext: sealed(&cipher, "4"), metadata: TypeMetadata::default() },
        ];

        let ticks = AtomicUsize::new(0);
        let progress: &ProgressFn<'_> = &|p: PushProgress| {
            assert_eq!(p.total, 4);
            ticks.fetch_add(1, Ordering::SeqCst);
        };
        let result = backend
            .push_many(ResourceType::Agents, items, Some(progress))
            .await
            .unwrap();

        assert_eq!(result.pushed, vec!["a", "d"]);
        assert_eq!(result.failed_count(), 2);
        assert!(result.failed.iter().any(|f| f.id == "c" && f.error.contains("unencrypted")));
        assert_eq!(ticks.load(Ordering::SeqCst), 4);
        assert_eq!(backend.push_many_calls().await, 1);
        assert!(backend.object(ResourceType::Agents, "c").await.is_none());
    }

    #[tokio::test]
    async fn test_pull_many_default() {
        let backend = MemoryBackend::new();
        let cipher = ChaChaCipher::new(EncryptionKey::generate());
        for id in ["x", "y"] {
            backend
                .push_one(ResourceType::Agents, id, &sealed(&cipher, id), &TypeMetadata::default())
                .await
                .unwrap();
        }

        let ids = vec!["x".to_string(), "y".to_string(), "z".to_string()];
        let mut results = backend.pull_many(ResourceType::Agents, &ids).await;
        results.sort_by(|a, b| a.0.cmp(&b.0));

        assert_eq!(results.len(), 3);
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_ok());
        assert!(results[2].1.as_ref().unwrap_err().is_not_found());
    }
}
