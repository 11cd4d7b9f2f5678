//! Conflicts and their resolution.
//!
//! A conflict exists when an item is present both locally and remotely and
//! the decrypted remote bytes hash differently from the local bytes. It is
//! raised and resolved within a single pull; nothing about it is persisted.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vaultsync_core::{basename, ResourceItem, ResourceType, TypeMetadata};

/// A detected divergence between a local and a remote copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Local id of the item.
    pub id: String,
    pub resource_type: ResourceType,
    pub local_location: Option<PathBuf>,
    pub local_modified: Option<DateTime<Utc>>,
    pub metadata: TypeMetadata,
}

impl Conflict {
    pub(crate) fn for_item(resource_type: ResourceType, item: &ResourceItem) -> Self {
        Self {
            id: item.id.clone(),
            resource_type,
            local_location: item.location.clone(),
            local_modified: item.last_modified,
            metadata: item.metadata.clone(),
        }
    }
}

/// Outcome chosen for a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    /// Leave the local copy; write nothing.
    KeepLocal,
    /// Overwrite the local copy through the normal write path.
    KeepRemote,
    /// Save the remote copy at the conflict location; local is untouched.
    KeepBoth,
}

/// Chooses a resolution per conflict.
///
/// This is where an interactive prompt plugs in. A pull with `force` set
/// never consults the resolver.
#[async_trait]
pub trait ConflictResolver: Send + Sync {
    async fn resolve(&self, conflict: &Conflict) -> Resolution;
}

/// Resolves every conflict the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedResolver(pub Resolution);

#[async_trait]
impl ConflictResolver for FixedResolver {
    async fn resolve(&self, _conflict: &Conflict) -> Resolution {
        self.0
    }
}

/// How a remote id relates to the local items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalMatch<'a> {
    /// The local counterpart of the remote item.
    Found(&'a ResourceItem),
    /// Only the last segment matches, and it points at a local item already
    /// claimed by another remote id or shared by several local items.
    Unavailable,
    /// Nothing local corresponds.
    Missing,
}

/// Local items keyed for matching against remote ids.
///
/// Matches by exact id first. Failing that, the last path segment of the
/// remote id is matched against the last segment of local ids, so
/// `proj/abc` remotely finds `abc` locally and the other way round.
///
/// Each local item answers for at most one remote id. Exact matches claim
/// their item before any fallback is tried, and a leaf shared by several
/// local items is ambiguous and never matches.
#[derive(Debug, Default)]
pub struct LocalIndex {
    by_id: HashMap<String, ResourceItem>,
    /// Leaf → local id, or `None` when ambiguous.
    by_leaf: HashMap<String, Option<String>>,
}

impl LocalIndex {
    pub fn new(items: Vec<ResourceItem>) -> Self {
        let mut index = Self::default();
        for item in items {
            index
                .by_leaf
                .entry(item.basename().to_string())
                .and_modify(|slot| *slot = None)
                .or_insert_with(|| Some(item.id.clone()));
            index.by_id.insert(item.id.clone(), item);
        }
        index
    }

    /// Match a whole remote listing, one result per id in order.
    pub fn match_remote<'a, S: AsRef<str>>(&'a self, remote_ids: &[S]) -> Vec<LocalMatch<'a>> {
        let mut claimed: HashSet<&'a str> = remote_ids
            .iter()
            .filter_map(|id| self.by_id.get(id.as_ref()))
            .map(|item| item.id.as_str())
            .collect();

        remote_ids
            .iter()
            .map(|remote_id| {
                let remote_id = remote_id.as_ref();
                if let Some(item) = self.by_id.get(remote_id) {
                    return LocalMatch::Found(item);
                }
                let Some(slot) = self.by_leaf.get(basename(remote_id)) else {
                    return LocalMatch::Missing;
                };
                match slot.as_ref().and_then(|local_id| self.by_id.get(local_id)) {
                    Some(item) if claimed.insert(item.id.as_str()) => LocalMatch::Found(item),
                    _ => LocalMatch::Unavailable,
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
