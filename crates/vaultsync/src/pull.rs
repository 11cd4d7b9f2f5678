//! Pull orchestration and conflict detection.
//!
//! Remote listing → classify against local items → (optionally) compare
//! content of items present on both sides → resolve conflicts → write.
//!
//! Conflicts are content-based: an item present on both sides conflicts
//! only if the decrypted remote bytes hash differently from the local
//! bytes. When that comparison cannot be completed the item is treated as
//! in sync; a missed conflict is preferred over an aborted pull.

use std::collections::HashMap;

use futures::future::join_all;
use tracing::{debug, info, warn};
use vaultsync_core::{
    basename, content_hash, RemoteResourceDescriptor, ResourceItem, SyncStrategy, TypeMetadata,
};
use vaultsync_resources::ResourceHandler;
use vaultsync_state::SyncUpdate;

use crate::conflict::{Conflict, ConflictResolver, LocalIndex, LocalMatch, Resolution};
use crate::engine::SyncContext;
use crate::error::{EngineError, Result};
use crate::report::PullReport;

/// Options for a pull.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullOptions {
    /// Compare items present on both sides. Without it only ids missing
    /// locally are pulled.
    pub reconcile: bool,
    /// Restrict to one remote item, by id or by last id segment.
    pub only: Option<String>,
    /// Resolve every conflict as keep-remote without asking.
    pub force: bool,
    /// Detect and report, write nothing.
    pub dry_run: bool,
}

/// An item selected for writing.
struct PullTarget {
    /// Id on the remote.
    remote_id: String,
    /// Id written and recorded locally; the matched local id if any.
    local_id: String,
    metadata: TypeMetadata,
    local: Option<ResourceItem>,
    /// Decrypted remote bytes, if conflict detection already fetched them.
    plaintext: Option<Vec<u8>>,
}

enum Detection {
    /// Content matches; carries the hash to record.
    Same(String),
    Differs(Vec<u8>),
    Indeterminate(String),
}

/// Pull one resource type.
pub async fn pull(
    ctx: &SyncContext,
    handler: &dyn ResourceHandler,
    options: &PullOptions,
    resolver: &dyn ConflictResolver,
) -> Result<PullReport> {
    let resource_type = handler.resource_type();
    let mut report = PullReport::new(resource_type);
    report.dry_run = options.dry_run;

    let mut remote = ctx.backend.list_all(resource_type).await?;
    if let Some(only) = &options.only {
        remote.retain(|d| d.id == *only || basename(&d.id) == only.as_str());
        if remote.is_empty() {
            return Err(EngineError::UnknownResource {
                resource_type,
                id: only.clone(),
            });
        }
    }
    report.remote_count = remote.len();
    if remote.is_empty() {
        info!(%resource_type, "nothing on remote");
        return Ok(report);
    }

    let local = LocalIndex::new(handler.enumerate_local(false, ctx.state.as_ref()).await?);

    let remote_ids: Vec<String> = remote.iter().map(|d| d.id.clone()).collect();
    let matches = local.match_remote(&remote_ids);

    let mut targets = Vec::new();
    let mut existing = Vec::new();
    for (mut descriptor, matched) in remote.into_iter().zip(matches) {
        match matched {
            LocalMatch::Found(item) => {
                descriptor.exists_locally = true;
                existing.push((descriptor, item.clone()));
            }
            LocalMatch::Unavailable => {
                warn!(id = %descriptor.id, "local counterpart is ambiguous or already matched, skipping");
                report.skipped_existing += 1;
            }
            LocalMatch::Missing => targets.push(new_target(descriptor)),
        }
    }

    let recorded = if options.reconcile {
        let (conflicts, same) = detect_conflicts(ctx, handler, existing, &mut report).await;
        resolve_conflicts(handler, conflicts, options, resolver, &mut targets, &mut report).await;
        same
    } else {
        report.skipped_existing += existing.len();
        Vec::new()
    };

    report.pull_set = targets.iter().map(|t| t.local_id.clone()).collect();
    if options.dry_run {
        info!(%resource_type, count = targets.len(), "dry run, not writing");
        return Ok(report);
    }

    apply(ctx, handler, targets, recorded, &mut report).await?;
    info!(
        %resource_type,
        pulled = report.pulled,
        failed = report.failed,
        conflicts = report.conflicts.count(),
        "pull finished"
    );
    Ok(report)
}

fn new_target(descriptor: RemoteResourceDescriptor) -> PullTarget {
    PullTarget {
        local_id: descriptor.id.clone(),
        metadata: descriptor.metadata.unwrap_or_default(),
        remote_id: descriptor.id,
        local: None,
        plaintext: None,
    }
}

type Conflicted = (RemoteResourceDescriptor, ResourceItem, Vec<u8>);

/// Compare every item present on both sides. Returns the conflicted ones
/// with their decrypted remote bytes, and state updates for the identical
/// ones.
async fn detect_conflicts(
    ctx: &SyncContext,
    handler: &dyn ResourceHandler,
    existing: Vec<(RemoteResourceDescriptor, ResourceItem)>,
    report: &mut PullReport,
) -> (Vec<Conflicted>, Vec<SyncUpdate>) {
    let resource_type = handler.resource_type();
    let mut conflicts = Vec::new();
    let mut same = Vec::new();
    for chunk in existing.chunks(ctx.batch_size.max(1)) {
        let outcomes = join_all(
            chunk
                .iter()
                .map(|(descriptor, item)| compare(ctx, handler, &descriptor.id, item)),
        )
        .await;

        for ((descriptor, item), outcome) in chunk.iter().zip(outcomes) {
            match outcome {
                Detection::Same(hash) => {
                    report.unchanged += 1;
                    same.push(SyncUpdate::new(resource_type, item.id.clone(), hash));
                }
                Detection::Differs(remote_plaintext) => {
                    debug!(id = %item.id, "conflict detected");
                    conflicts.push((descriptor.clone(), item.clone(), remote_plaintext));
                }
                Detection::Indeterminate(reason) => {
                    warn!(id = %item.id, %reason, "could not compare, assuming in sync");
                    report.unchanged += 1;
                }
            }
        }
    }
    (conflicts, same)
}

async fn compare(
    ctx: &SyncContext,
    handler: &dyn ResourceHandler,
    remote_id: &str,
    item: &ResourceItem,
) -> Detection {
    let sealed = match ctx.backend.pull_one(handler.resource_type(), remote_id).await {
        Ok(sealed) => sealed,
        Err(e) => return Detection::Indeterminate(e.to_string()),
    };
    let remote = match ctx.cipher.decrypt(&sealed) {
        Ok(plaintext) => plaintext,
        Err(e) => return Detection::Indeterminate(e.to_string()),
    };
    let local = match handler.read_local(item).await {
        Ok(bytes) => bytes,
        Err(e) => return Detection::Indeterminate(e.to_string()),
    };

    let local_hash = content_hash(&local);
    if content_hash(&remote) == local_hash {
        Detection::Same(local_hash.to_hex())
    } else {
        Detection::Differs(remote)
    }
}

async fn resolve_conflicts(
    handler: &dyn ResourceHandler,
    conflicts: Vec<Conflicted>,
    options: &PullOptions,
    resolver: &dyn ConflictResolver,
    targets: &mut Vec<PullTarget>,
    report: &mut PullReport,
) {
    let resource_type = handler.resource_type();
    for (descriptor, item, remote_plaintext) in conflicts {
        let conflict = Conflict::for_item(resource_type, &item);
        let resolution = if options.force {
            Resolution::KeepRemote
        } else {
            resolver.resolve(&conflict).await
        };
        debug!(id = %item.id, ?resolution, "conflict resolved");
        report.conflicts.detected.push(conflict);

        match resolution {
            Resolution::KeepLocal => report.conflicts.kept_local += 1,
            Resolution::KeepRemote => {
                report.conflicts.kept_remote += 1;
                targets.push(PullTarget {
                    remote_id: descriptor.id,
                    local_id: item.id.clone(),
                    metadata: item.metadata.clone(),
                    local: Some(item),
                    plaintext: Some(remote_plaintext),
                });
            }
            Resolution::KeepBoth if options.dry_run => report.conflicts.kept_both += 1,
            Resolution::KeepBoth => {
                match handler
                    .write_conflict_copy(&item.id, &remote_plaintext, &item.metadata)
                    .await
                {
                    Ok(path) => {
                        info!(id = %item.id, path = %path.display(), "saved remote copy beside local");
                        report.conflicts.kept_both += 1;
                        report.conflicts.conflict_copies.push(path);
                    }
                    Err(e) => {
                        warn!(id = %item.id, error = %e, "could not save conflict copy");
                        report.fail(&item.id, e);
                    }
                }
            }
        }
    }
}

/// Write every target and record the hashes of what was written, along
/// with `recorded` (items found identical on both sides) in one state save.
async fn apply(
    ctx: &SyncContext,
    handler: &dyn ResourceHandler,
    targets: Vec<PullTarget>,
    recorded: Vec<SyncUpdate>,
    report: &mut PullReport,
) -> Result<()> {
    let resource_type = handler.resource_type();

    let to_fetch: Vec<String> = targets
        .iter()
        .filter(|t| t.plaintext.is_none())
        .map(|t| t.remote_id.clone())
        .collect();
    let mut fetched: HashMap<String, _> = ctx
        .backend
        .pull_many(resource_type, &to_fetch)
        .await
        .into_iter()
        .collect();

    let mut updates = Vec::with_capacity(targets.len());
    for target in targets {
        let remote = match target.plaintext {
            Some(plaintext) => plaintext,
            None => {
                let sealed = match fetched.remove(&target.remote_id) {
                    Some(Ok(sealed)) => sealed,
                    Some(Err(e)) => {
                        warn!(id = %target.remote_id, error = %e, "pull failed");
                        report.fail(&target.local_id, e);
                        continue;
                    }
                    None => {
                        report.fail(&target.local_id, "backend returned no result");
                        continue;
                    }
                };
                match ctx.cipher.decrypt(&sealed) {
                    Ok(plaintext) => plaintext,
                    Err(e) => {
                        warn!(id = %target.remote_id, error = %e, "decrypt failed");
                        report.fail(&target.local_id, e);
                        continue;
                    }
                }
            }
        };

        let bytes = match (&target.local, handler.config().strategy) {
            (Some(local), SyncStrategy::Merge) => match handler.read_local(local).await {
                Ok(local_bytes) => handler.merge(&local_bytes, &remote).unwrap_or(remote),
                Err(e) => {
                    warn!(id = %target.local_id, error = %e, "local copy unreadable, writing remote as is");
                    remote
                }
            },
            _ => remote,
        };

        match handler
            .write_local(&target.local_id, &bytes, &target.metadata)
            .await
        {
            Ok(path) => {
                debug!(id = %target.local_id, path = %path.display(), "written");
                updates.push(SyncUpdate::new(
                    resource_type,
                    target.local_id,
                    content_hash(&bytes).to_hex(),
                ));
            }
            Err(e) => {
                warn!(id = %target.local_id, error = %e, "write failed");
                report.fail(target.local_id, e);
            }
        }
    }

    report.pulled += updates.len();
    updates.extend(recorded);
    ctx.state.update_batch(&updates).await?;
    Ok(())
}
