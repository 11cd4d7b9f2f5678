//! ResourceHandler trait: the local side of synchronization.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use vaultsync_core::{content_hash, ResourceItem, ResourceType, ResourceTypeConfig, TypeMetadata};
use vaultsync_state::StateStore;

use crate::error::{ResourceError, Result};

/// Maps logical ids of one resource type to files under the local root.
///
/// Implementors provide discovery and the id ↔ path mapping; reading,
/// writing and change detection are shared provided methods.
///
/// # Design Notes
///
/// - **Content, not clocks**: `enumerate_local` with `filter_changed` keeps
///   an item only if its BLAKE3 hash differs from the recorded one (or
///   nothing is recorded). Modification times are informational.
/// - **Inverse mapping**: `resolve_storage_location` must invert the id
///   derivation used by `discover`, so a pulled id lands where a local
///   discovery would have found it.
/// - **Optional capabilities**: `merge` and `resolve_conflict_location`
///   have defaults (no merge, `.conflict` before the extension).
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// The type this handler manages.
    fn resource_type(&self) -> ResourceType;

    /// Static configuration of the handled type.
    fn config(&self) -> ResourceTypeConfig {
        self.resource_type().config()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Required
    // ─────────────────────────────────────────────────────────────────────

    /// Raw enumeration of every local item, empty files included.
    async fn discover(&self) -> Result<Vec<ResourceItem>>;

    /// Canonical location of `id`.
    fn resolve_storage_location(&self, id: &str, metadata: &TypeMetadata) -> Result<PathBuf>;

    // ─────────────────────────────────────────────────────────────────────
    // Optional capabilities
    // ─────────────────────────────────────────────────────────────────────

    /// Where a keep-both copy of `id` is written.
    fn resolve_conflict_location(&self, id: &str, metadata: &TypeMetadata) -> Result<PathBuf> {
        self.resolve_storage_location(id, metadata)
            .map(|path| conflict_path(&path))
    }

    /// Reconcile local and remote content. `None` means the type does not
    /// merge and the remote copy is written verbatim.
    fn merge(&self, _local: &[u8], _remote: &[u8]) -> Option<Vec<u8>> {
        None
    }

    // ─────────────────────────────────────────────────────────────────────
    // Provided
    // ─────────────────────────────────────────────────────────────────────

    /// Every local item with content, optionally only those changed since
    /// the last recorded transfer.
    ///
    /// Zero-byte files are always skipped. Items that cannot be read are
    /// kept so the caller reports the failure.
    async fn enumerate_local(
        &self,
        filter_changed: bool,
        state: &dyn StateStore,
    ) -> Result<Vec<ResourceItem>> {
        let resource_type = self.resource_type();
        let items = self.discover().await?;
        let recorded = if filter_changed {
            Some(state.load().await)
        } else {
            None
        };

        let mut kept = Vec::with_capacity(items.len());
        for item in items {
            let Some(recorded) = &recorded else {
                let path = self.location_of(&item)?;
                match tokio::fs::metadata(&path).await {
                    Ok(meta) if meta.len() == 0 => debug!(id = %item.id, "skipping empty file"),
                    Ok(_) => kept.push(item),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        warn!(id = %item.id, error = %e, "cannot stat local item");
                        kept.push(item);
                    }
                }
                continue;
            };

            match self.read_local(&item).await {
                Ok(bytes) if bytes.is_empty() => debug!(id = %item.id, "skipping empty file"),
                Ok(bytes) => {
                    let hash = content_hash(&bytes).to_hex();
                    if recorded.hash_of(resource_type, &item.id) != Some(hash.as_str()) {
                        kept.push(item);
                    }
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    warn!(id = %item.id, error = %e, "cannot read local item");
                    kept.push(item);
                }
            }
        }

        debug!(%resource_type, filter_changed, count = kept.len(), "enumerated local items");
        Ok(kept)
    }

    /// The item's location, resolving it from the id if discovery left it
    /// unset.
    fn location_of(&self, item: &ResourceItem) -> Result<PathBuf> {
        match &item.location {
            Some(path) => Ok(path.clone()),
            None => self.resolve_storage_location(&item.id, &item.metadata),
        }
    }

    /// Current bytes of a local item.
    async fn read_local(&self, item: &ResourceItem) -> Result<Vec<u8>> {
        let path = self.location_of(item)?;
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ResourceError::NotFound {
                    resource_type: self.resource_type(),
                    id: item.id.clone(),
                }
            } else {
                ResourceError::io(path, e)
            }
        })
    }

    /// Write `bytes` to the canonical location of `id`, creating parents.
    async fn write_local(&self, id: &str, bytes: &[u8], metadata: &TypeMetadata) -> Result<PathBuf> {
        let path = self.resolve_storage_location(id, metadata)?;
        write_file(&path, bytes).await?;
        Ok(path)
    }

    /// Write a keep-both copy of `id`. The canonical file is not touched.
    async fn write_conflict_copy(
        &self,
        id: &str,
        bytes: &[u8],
        metadata: &TypeMetadata,
    ) -> Result<PathBuf> {
        let path = self.resolve_conflict_location(id, metadata)?;
        write_file(&path, bytes).await?;
        Ok(path)
    }
}

/// Marker inserted before the extension of keep-both copies.
const CONFLICT_MARKER: &str = ".conflict";

/// `dir/name.ext` → `dir/name.conflict.ext`; `dir/name` → `dir/name.conflict`.
pub fn conflict_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}{CONFLICT_MARKER}.{}", ext.to_string_lossy()),
        None => format!("{stem}{CONFLICT_MARKER}"),
    };
    path.with_file_name(name)
}

/// Whether `path` is a keep-both copy made by [`conflict_path`]. Such
/// copies are local only and never discovered as resources.
pub(crate) fn is_conflict_copy(path: &Path) -> bool {
    let named = |part: Option<&std::ffi::OsStr>| {
        part.and_then(|s| s.to_str())
            .is_some_and(|s| s.ends_with(CONFLICT_MARKER))
    };
    named(path.file_stem()) || named(path.file_name())
}

/// Reject id segments that would escape the resource root.
pub(crate) fn check_segment(resource_type: ResourceType, id: &str, segment: &str) -> Result<()> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains('/')
        || segment.contains('\\')
    {
        return Err(ResourceError::invalid_id(resource_type, id));
    }
    Ok(())
}

/// Build an item for a discovered file.
pub(crate) async fn file_item(
    id: String,
    path: PathBuf,
    metadata: TypeMetadata,
) -> Result<ResourceItem> {
    let stat = tokio::fs::metadata(&path)
        .await
        .map_err(|e| ResourceError::io(&path, e))?;
    let last_modified = stat.modified().ok().map(DateTime::<Utc>::from);
    Ok(ResourceItem {
        id,
        location: Some(path),
        last_modified,
        metadata,
    })
}

/// Entries of `dir`, or nothing if it does not exist.
pub(crate) async fn read_dir_entries(dir: &Path) -> Result<Vec<tokio::fs::DirEntry>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ResourceError::io(dir, e)),
    };
    let mut out = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ResourceError::io(dir, e))?
    {
        out.push(entry);
    }
    Ok(out)
}

pub(crate) async fn is_file(entry: &tokio::fs::DirEntry) -> bool {
    entry.file_type().await.map(|t| t.is_file()).unwrap_or(false)
}

pub(crate) async fn is_dir(entry: &tokio::fs::DirEntry) -> bool {
    entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false)
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ResourceError::io(parent, e))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| ResourceError::io(path, e))
}
