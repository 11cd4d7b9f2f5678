//! Push orchestration.
//!
//! Local delta → encrypt → upload → record. The sync state is only written
//! for items the backend confirmed, so a failed or interrupted push is
//! retried by the next one.

use std::collections::HashMap;

use futures::future::join_all;
use tracing::{debug, info, warn};
use vaultsync_backend::{ProgressFn, PushItem};
use vaultsync_core::{content_hash, ResourceItem};
use vaultsync_resources::ResourceHandler;
use vaultsync_state::SyncUpdate;

use crate::engine::SyncContext;
use crate::error::{EngineError, Result};
use crate::report::PushReport;

/// Options for a push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushOptions {
    /// Push every local item, not only those changed since the last sync.
    pub all: bool,
    /// Restrict to one item, by id or by last id segment.
    pub only: Option<String>,
    /// Select candidates but transfer nothing.
    pub dry_run: bool,
}

/// An item read, hashed and encrypted, ready for the backend.
struct Prepared {
    item: PushItem,
    hash: String,
}

/// Push one resource type.
///
/// Per-item failures are collected in the report; only enumeration,
/// selection and state persistence errors abort.
pub async fn push(
    ctx: &SyncContext,
    handler: &dyn ResourceHandler,
    options: &PushOptions,
    progress: Option<&ProgressFn<'_>>,
) -> Result<PushReport> {
    let resource_type = handler.resource_type();
    let mut report = PushReport::new(resource_type);
    report.dry_run = options.dry_run;

    let mut candidates = handler
        .enumerate_local(!options.all, ctx.state.as_ref())
        .await?;
    if let Some(only) = &options.only {
        candidates.retain(|item| matches_name(item, only));
        if candidates.is_empty() && !exists_locally(ctx, handler, only).await? {
            return Err(EngineError::UnknownResource {
                resource_type,
                id: only.clone(),
            });
        }
    }
    report.candidates = candidates.iter().map(|item| item.id.clone()).collect();

    if candidates.is_empty() {
        info!(%resource_type, "nothing to push");
        return Ok(report);
    }
    if options.dry_run {
        info!(%resource_type, count = candidates.len(), "dry run, not pushing");
        return Ok(report);
    }

    if let [item] = candidates.as_slice() {
        push_single(ctx, handler, item, &mut report).await?;
    } else {
        push_batch(ctx, handler, &candidates, progress, &mut report).await?;
    }

    info!(
        %resource_type,
        pushed = report.pushed,
        failed = report.failed,
        "push finished"
    );
    Ok(report)
}

async fn push_single(
    ctx: &SyncContext,
    handler: &dyn ResourceHandler,
    item: &ResourceItem,
    report: &mut PushReport,
) -> Result<()> {
    let resource_type = handler.resource_type();
    let prepared = match prepare(ctx, handler, item).await {
        Ok(prepared) => prepared,
        Err(e) => {
            warn!(id = %item.id, error = %e, "could not prepare item");
            report.fail(&item.id, e);
            return Ok(());
        }
    };

    let PushItem {
        id,
        ciphertext,
        metadata,
    } = prepared.item;
    if let Err(e) = ctx
        .backend
        .push_one(resource_type, &id, &ciphertext, &metadata)
        .await
    {
        warn!(%id, error = %e, "push failed");
        report.fail(id, e);
        return Ok(());
    }

    ctx.state
        .update_one(resource_type, &id, &prepared.hash)
        .await?;
    report.pushed += 1;
    debug!(%id, "pushed");
    Ok(())
}

async fn push_batch(
    ctx: &SyncContext,
    handler: &dyn ResourceHandler,
    candidates: &[ResourceItem],
    progress: Option<&ProgressFn<'_>>,
    report: &mut PushReport,
) -> Result<()> {
    let resource_type = handler.resource_type();
    let mut items = Vec::with_capacity(candidates.len());
    let mut hashes = HashMap::with_capacity(candidates.len());

    for chunk in candidates.chunks(ctx.batch_size.max(1)) {
        let outcomes = join_all(chunk.iter().map(|item| prepare(ctx, handler, item))).await;
        for (item, outcome) in chunk.iter().zip(outcomes) {
            match outcome {
                Ok(prepared) => {
                    hashes.insert(prepared.item.id.clone(), prepared.hash);
                    items.push(prepared.item);
                }
                Err(e) => {
                    warn!(id = %item.id, error = %e, "could not prepare item");
                    report.fail(&item.id, e);
                }
            }
        }
    }

    if items.is_empty() {
        return Ok(());
    }

    let submitted: Vec<String> = items.iter().map(|item| item.id.clone()).collect();
    debug!(%resource_type, count = submitted.len(), "handing batch to backend");
    let result = match ctx.backend.push_many(resource_type, items, progress).await {
        Ok(result) => result,
        Err(e) => {
            warn!(%resource_type, error = %e, "bulk push failed");
            let text = e.to_string();
            for id in submitted {
                report.fail(id, &text);
            }
            return Ok(());
        }
    };

    let updates: Vec<SyncUpdate> = result
        .pushed
        .iter()
        .filter_map(|id| {
            hashes
                .get(id)
                .map(|hash| SyncUpdate::new(resource_type, id.clone(), hash.clone()))
        })
        .collect();
    ctx.state.update_batch(&updates).await?;

    report.pushed += result.pushed.len();
    for failure in result.failed {
        report.fail(failure.id, failure.error);
    }
    Ok(())
}

/// Read, hash and encrypt one item.
async fn prepare(
    ctx: &SyncContext,
    handler: &dyn ResourceHandler,
    item: &ResourceItem,
) -> Result<Prepared> {
    let plaintext = handler.read_local(item).await?;
    let hash = content_hash(&plaintext).to_hex();
    let ciphertext = ctx.cipher.encrypt(&plaintext)?;
    Ok(Prepared {
        item: PushItem {
            id: item.id.clone(),
            ciphertext,
            metadata: item.metadata.clone(),
        },
        hash,
    })
}

fn matches_name(item: &ResourceItem, name: &str) -> bool {
    item.id == name || item.basename() == name
}

async fn exists_locally(ctx: &SyncContext, handler: &dyn ResourceHandler, name: &str) -> Result<bool> {
    Ok(handler
        .enumerate_local(false, ctx.state.as_ref())
        .await?
        .iter()
        .any(|item| matches_name(item, name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;
    use vaultsync_backend::MemoryBackend;
    use vaultsync_core::ResourceType;
    use vaultsync_crypto::{ChaChaCipher, EncryptionKey};
    use vaultsync_resources::AgentHandler;
    use vaultsync_state::{MemoryStateStore, StateStore};

    struct Setup {
        dir: TempDir,
        backend: Arc<MemoryBackend>,
        state: Arc<MemoryStateStore>,
        ctx: SyncContext,
        handler: AgentHandler,
    }

    fn setup() -> Setup {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(MemoryBackend::new());
        let state = Arc::new(MemoryStateStore::new());
        let ctx = SyncContext {
            backend: backend.clone(),
            state: state.clone(),
            cipher: Arc::new(ChaChaCipher::new(EncryptionKey::generate())),
            batch_size: 2,
        };
        let handler = AgentHandler::new(dir.path());
        Setup {
            dir,
            backend,
            state,
            ctx,
            handler,
        }
    }

    async fn agent(setup: &Setup, name: &str, body: &str) {
        let dir = setup.dir.path().join("agents");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join(format!("{name}.md")), body).await.unwrap();
    }

    #[tokio::test]
    async fn test_single_item_uses_push_one() {
        let s = setup();
        agent(&s, "solo", "# Solo").await;

        let report = push(&s.ctx, &s.handler, &PushOptions::default(), None)
            .await
            .unwrap();

        assert_eq!(report.pushed, 1);
        assert_eq!(s.backend.push_many_calls().await, 0);
        let sealed = s.backend.object(ResourceType::Agents, "solo").await.unwrap();
        assert_eq!(s.ctx.cipher.decrypt(&sealed).unwrap(), b"# Solo");
        assert_eq!(
            s.state.get_hash(ResourceType::Agents, "solo").await,
            Some(content_hash(b"# Solo").to_hex())
        );
    }

    #[tokio::test]
    async fn test_batches_share_one_push_many() {
        let s = setup();
        for i in 0..5 {
            agent(&s, &format!("a{i}"), &format!("# {i}")).await;
        }

        let report = push(&s.ctx, &s.handler, &PushOptions::default(), None)
            .await
            .unwrap();

        assert_eq!(report.candidates.len(), 5);
        assert_eq!(report.pushed, 5);
        assert_eq!(s.backend.push_many_calls().await, 1);
        assert_eq!(s.state.saves(), 1);
    }

    #[tokio::test]
    async fn test_remote_failure_not_recorded() {
        let s = setup();
        agent(&s, "ok", "# ok").await;
        agent(&s, "bad", "# bad").await;
        s.backend.fail_pushes_for("bad").await;

        let report = push(&s.ctx, &s.handler, &PushOptions::default(), None)
            .await
            .unwrap();

        assert_eq!(report.pushed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors[0].id, "bad");
        assert!(s.state.get_hash(ResourceType::Agents, "ok").await.is_some());
        assert!(s.state.get_hash(ResourceType::Agents, "bad").await.is_none());
    }

    #[tokio::test]
    async fn test_dry_run_transfers_nothing() {
        let s = setup();
        agent(&s, "a", "# a").await;
        agent(&s, "b", "# b").await;

        let options = PushOptions {
            dry_run: true,
            ..Default::default()
        };
        let report = push(&s.ctx, &s.handler, &options, None).await.unwrap();

        assert_eq!(report.candidates, vec!["a", "b"]);
        assert_eq!(report.pushed, 0);
        assert!(s.backend.is_empty().await);
        assert_eq!(s.state.saves(), 0);
    }

    #[tokio::test]
    async fn test_only_selects_one_and_rejects_unknown() {
        let s = setup();
        agent(&s, "a", "# a").await;
        agent(&s, "b", "# b").await;

        let options = PushOptions {
            only: Some("b".into()),
            ..Default::default()
        };
        let report = push(&s.ctx, &s.handler, &options, None).await.unwrap();
        assert_eq!(report.candidates, vec!["b"]);
        assert!(s.backend.object(ResourceType::Agents, "a").await.is_none());

        // Unchanged but present: nothing to do, not an error.
        let report = push(&s.ctx, &s.handler, &options, None).await.unwrap();
        assert!(report.candidates.is_empty());

        let options = PushOptions {
            only: Some("missing".into()),
            ..Default::default()
        };
        let err = push(&s.ctx, &s.handler, &options, None).await.unwrap_err();
        assert!(matches!(err, EngineError::UnknownResource { .. }));
    }

    #[tokio::test]
    async fn test_all_ignores_change_filter() {
        let s = setup();
        agent(&s, "a", "# a").await;
        push(&s.ctx, &s.handler, &PushOptions::default(), None)
            .await
            .unwrap();

        let again = push(&s.ctx, &s.handler, &PushOptions::default(), None)
            .await
            .unwrap();
        assert!(again.candidates.is_empty());

        let options = PushOptions {
            all: true,
            ..Default::default()
        };
        let forced = push(&s.ctx, &s.handler, &options, None).await.unwrap();
        assert_eq!(forced.pushed, 1);
    }
}
