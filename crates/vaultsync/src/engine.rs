//! The engine: one entry point over handlers, backend, state and cipher.

use std::sync::Arc;

use tracing::info;
use vaultsync_backend::{Backend, BackendError, GitBackend, ProgressFn, S3Backend};
use vaultsync_core::ResourceType;
use vaultsync_crypto::{ChaChaCipher, Cipher, EncryptionKey};
use vaultsync_resources::{HandlerSet, ResourceHandler};
use vaultsync_state::{JsonStateStore, StateStore};

use crate::config::{BackendConfig, SyncConfig, DEFAULT_BATCH_SIZE};
use crate::conflict::{ConflictResolver, FixedResolver, Resolution};
use crate::error::{EngineError, Result};
use crate::pull::{self, PullOptions};
use crate::push::{self, PushOptions};
use crate::report::{PullReport, PushReport};

/// The collaborators every orchestration step needs.
#[derive(Clone)]
pub struct SyncContext {
    pub backend: Arc<dyn Backend>,
    pub state: Arc<dyn StateStore>,
    pub cipher: Arc<dyn Cipher>,
    /// Items prepared or compared concurrently.
    pub batch_size: usize,
}

impl SyncContext {
    pub fn new(
        backend: Arc<dyn Backend>,
        state: Arc<dyn StateStore>,
        cipher: Arc<dyn Cipher>,
    ) -> Self {
        Self {
            backend,
            state,
            cipher,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

/// Sync engine.
///
/// Provides push and pull per resource type or across all of them.
/// Without a resolver, pulls keep the local side of every conflict.
pub struct SyncEngine {
    ctx: SyncContext,
    handlers: HandlerSet,
}

impl SyncEngine {
    pub fn new(ctx: SyncContext, handlers: HandlerSet) -> Self {
        Self { ctx, handlers }
    }

    /// Build an engine from configuration.
    ///
    /// Fails with `NotConfigured` before touching anything remote if the
    /// key is missing or no backend is chosen.
    pub async fn open(config: &SyncConfig) -> Result<Self> {
        config.validate()?;

        let key = EncryptionKey::load(&config.key_path).map_err(|e| {
            EngineError::NotConfigured(format!(
                "encryption key {}: {e}",
                config.key_path.display()
            ))
        })?;

        let backend: Arc<dyn Backend> = match &config.backend {
            BackendConfig::None => {
                return Err(EngineError::NotConfigured("no backend configured".to_string()))
            }
            BackendConfig::Git(git) => {
                Arc::new(GitBackend::open(git.clone()).map_err(setup_error)?)
            }
            BackendConfig::S3(s3) => Arc::new(S3Backend::connect(s3).await.map_err(setup_error)?),
        };
        info!(backend = backend.name(), claude_dir = %config.claude_dir.display(), "engine ready");

        let ctx = SyncContext::new(
            backend,
            Arc::new(JsonStateStore::new(&config.state_path)),
            Arc::new(ChaChaCipher::new(key)),
        )
        .with_batch_size(config.batch_size);
        Ok(Self::new(ctx, HandlerSet::new(&config.claude_dir)))
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    pub fn handlers(&self) -> &HandlerSet {
        &self.handlers
    }

    fn handler(&self, resource_type: ResourceType) -> Result<Arc<dyn ResourceHandler>> {
        self.handlers
            .get(resource_type)
            .ok_or(EngineError::NoHandler(resource_type))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Push
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn push(&self, resource_type: ResourceType, options: &PushOptions) -> Result<PushReport> {
        let handler = self.handler(resource_type)?;
        push::push(&self.ctx, handler.as_ref(), options, None).await
    }

    /// Push, reporting bulk upload progress to `progress`.
    pub async fn push_with_progress(
        &self,
        resource_type: ResourceType,
        options: &PushOptions,
        progress: &ProgressFn<'_>,
    ) -> Result<PushReport> {
        let handler = self.handler(resource_type)?;
        push::push(&self.ctx, handler.as_ref(), options, Some(progress)).await
    }

    /// Push every registered type. `only` is ignored.
    pub async fn push_all(&self, options: &PushOptions) -> Result<Vec<PushReport>> {
        let options = PushOptions {
            only: None,
            ..options.clone()
        };
        let mut reports = Vec::new();
        for resource_type in self.handlers.types() {
            reports.push(self.push(resource_type, &options).await?);
        }
        Ok(reports)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pull
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn pull(&self, resource_type: ResourceType, options: &PullOptions) -> Result<PullReport> {
        self.pull_with_resolver(resource_type, options, &FixedResolver(Resolution::KeepLocal))
            .await
    }

    pub async fn pull_with_resolver(
        &self,
        resource_type: ResourceType,
        options: &PullOptions,
        resolver: &dyn ConflictResolver,
    ) -> Result<PullReport> {
        let handler = self.handler(resource_type)?;
        pull::pull(&self.ctx, handler.as_ref(), options, resolver).await
    }

    /// Pull every registered type. `only` is ignored.
    pub async fn pull_all(
        &self,
        options: &PullOptions,
        resolver: &dyn ConflictResolver,
    ) -> Result<Vec<PullReport>> {
        let options = PullOptions {
            only: None,
            ..options.clone()
        };
        let mut reports = Vec::new();
        for resource_type in self.handlers.types() {
            reports.push(self.pull_with_resolver(resource_type, &options, resolver).await?);
        }
        Ok(reports)
    }
}

/// Backend setup failures are configuration problems.
fn setup_error(error: BackendError) -> EngineError {
    match error {
        BackendError::NotConfigured(message) => EngineError::NotConfigured(message),
        other => EngineError::Backend(other),
    }
}
