//! StateStore trait: the abstract interface for sync state persistence.

use async_trait::async_trait;
use vaultsync_core::ResourceType;

use crate::error::Result;
use crate::model::{SyncState, SyncUpdate};

/// Async interface to the sync state.
///
/// # Design Notes
///
/// - `load` never fails: missing or corrupt state loads as empty.
/// - `update_one` / `update_batch` are a single load-merge-save; a batch
///   performs exactly one save regardless of its length.
/// - Calls on one instance are serialized. Implementations hold a lock
///   across the whole load-merge-save.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the full state.
    async fn load(&self) -> SyncState;

    /// Persist the full state, replacing what was there.
    async fn save(&self, state: &SyncState) -> Result<()>;

    /// Record one successful transfer.
    async fn update_one(&self, resource_type: ResourceType, id: &str, hash: &str) -> Result<()> {
        self.update_batch(&[SyncUpdate::new(resource_type, id, hash)])
            .await
    }

    /// Record many successful transfers with a single save.
    async fn update_batch(&self, updates: &[SyncUpdate]) -> Result<()>;

    /// The hash recorded at the last successful transfer, if any.
    async fn get_hash(&self, resource_type: ResourceType, id: &str) -> Option<String> {
        self.load()
            .await
            .hash_of(resource_type, id)
            .map(str::to_string)
    }
}
