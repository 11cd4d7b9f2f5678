//! S3-compatible object store backend.
//!
//! Objects live at `{root}{remote_key}` in a single bucket. Bulk pushes
//! upload concurrently; there is no transaction, so each object succeeds or
//! fails on its own.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vaultsync_core::{
    id_from_remote_key, remote_key, RemoteResourceDescriptor, ResourceType, TypeMetadata,
};

use crate::error::{BackendError, Result};
use crate::traits::{
    ensure_encrypted, Backend, ItemError, ProgressFn, PushItem, PushManyResult, PushProgress,
};

/// Concurrent uploads in [`S3Backend::push_many`].
const UPLOAD_CONCURRENCY: usize = 8;

/// User metadata key carrying the session project.
const PROJECT_METADATA: &str = "project";

/// Configuration for [`S3Backend`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3BackendConfig {
    pub bucket: String,
    /// Root prefix inside the bucket, e.g. `"vaultsync/"`.
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services (MinIO, R2, ...).
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl S3BackendConfig {
    /// Root prefix normalized to end in `/` (or empty).
    fn root(&self) -> String {
        let trimmed = self.prefix.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("{trimmed}/")
        }
    }
}

/// Full object key for `(resource_type, id)` under `root`.
fn object_key(root: &str, resource_type: ResourceType, id: &str) -> String {
    format!("{root}{}", remote_key(resource_type, id))
}

/// Backend over an S3 bucket.
#[derive(Clone)]
pub struct S3Backend {
    client: Client,
    bucket: String,
    root: String,
}

impl S3Backend {
    /// Build a client from the ambient AWS configuration (env, profile,
    /// instance metadata) plus the overrides in `config`.
    pub async fn connect(config: &S3BackendConfig) -> Result<Self> {
        if config.bucket.is_empty() {
            return Err(BackendError::NotConfigured("s3 bucket is empty".to_string()));
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint {
            // S3-compatible services generally require path-style addressing.
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        info!(bucket = %config.bucket, prefix = %config.prefix, "s3 backend ready");
        Ok(Self::from_client(Client::from_conf(builder.build()), config))
    }

    /// Wrap an existing client.
    pub fn from_client(client: Client, config: &S3BackendConfig) -> Self {
        Self {
            client,
            bucket: config.bucket.clone(),
            root: config.root(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(
        &self,
        resource_type: ResourceType,
        id: &str,
        ciphertext: Vec<u8>,
        metadata: &TypeMetadata,
    ) -> Result<()> {
        ensure_encrypted(id, &ciphertext)?;
        let key = object_key(&self.root, resource_type, id);

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type("application/octet-stream")
            .body(ByteStream::from(ciphertext));
        if let Some(project) = &metadata.project {
            request = request.metadata(PROJECT_METADATA, project);
        }
        request.send().await.map_err(|e| {
            BackendError::S3(format!("put {key}: {}", DisplayErrorContext(&e)))
        })?;
        debug!(%key, "uploaded");
        Ok(())
    }
}

#[async_trait]
impl Backend for S3Backend {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn push_one(
        &self,
        resource_type: ResourceType,
        id: &str,
        ciphertext: &[u8],
        metadata: &TypeMetadata,
    ) -> Result<()> {
        self.put(resource_type, id, ciphertext.to_vec(), metadata).await
    }

    async fn push_many(
        &self,
        resource_type: ResourceType,
        items: Vec<PushItem>,
        progress: Option<&ProgressFn<'_>>,
    ) -> Result<PushManyResult> {
        let total = items.len();
        let mut uploads = stream::iter(items)
            .map(|item| async move {
                let outcome = self
                    .put(resource_type, &item.id, item.ciphertext, &item.metadata)
                    .await;
                (item.id, outcome)
            })
            .buffer_unordered(UPLOAD_CONCURRENCY);

        let mut result = PushManyResult::default();
        let mut completed = 0;
        while let Some((id, outcome)) = uploads.next().await {
            completed += 1;
            match outcome {
                Ok(()) => result.pushed.push(id),
                Err(e) => {
                    warn!(%id, error = %e, "upload failed");
                    result.failed.push(ItemError::new(id, e));
                }
            }
            if let Some(progress) = progress {
                progress(PushProgress { completed, total });
            }
        }
        Ok(result)
    }

    async fn pull_one(&self, resource_type: ResourceType, id: &str) -> Result<Vec<u8>> {
        let key = object_key(&self.root, resource_type, id);
        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Err(BackendError::not_found(resource_type, id));
                }
                return Err(BackendError::S3(format!(
                    "get {key}: {}",
                    DisplayErrorContext(&service_error)
                )));
            }
        };

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| BackendError::S3(format!("read {key}: {e}")))?;
        Ok(body.into_bytes().to_vec())
    }

    async fn list_all(&self, resource_type: ResourceType) -> Result<Vec<RemoteResourceDescriptor>> {
        let list_prefix = format!("{}{}", self.root, resource_type.config().storage_prefix);
        let mut descriptors = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&list_prefix);
            if let Some(token) = continuation.take() {
                request = request.continuation_token(token);
            }
            let page = request.send().await.map_err(|e| {
                BackendError::S3(format!("list {list_prefix}: {}", DisplayErrorContext(&e)))
            })?;

            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                let Some(relative) = key.strip_prefix(self.root.as_str()) else {
                    continue;
                };
                if let Some(id) = id_from_remote_key(resource_type, relative)? {
                    descriptors.push(RemoteResourceDescriptor::listed(resource_type, id));
                }
            }

            match page.next_continuation_token() {
                Some(token) if page.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        debug!(%resource_type, count = descriptors.len(), "listed s3 objects");
        Ok(descriptors)
    }

    async fn delete_one(&self, resource_type: ResourceType, id: &str) -> Result<()> {
        let key = object_key(&self.root, resource_type, id);
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| BackendError::S3(format!("delete {key}: {}", DisplayErrorContext(&e))))?;
        Ok(())
    }
}
