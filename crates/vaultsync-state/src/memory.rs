//! In-memory implementation of the StateStore trait.
//!
//! This is primarily for testing. It has the same semantics as the JSON
//! store but keeps everything in memory, and counts saves so tests can
//! check that batches are written once.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::model::{SyncState, SyncUpdate};
use crate::traits::StateStore;

/// In-memory state store.
#[derive(Default)]
pub struct MemoryStateStore {
    state: Mutex<SyncState>,
    saves: AtomicUsize,
}

impl MemoryStateStore {
    /// Create a store holding the empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store preloaded with `state`.
    pub fn with_state(state: SyncState) -> Self {
        Self {
            state: Mutex::new(state),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of times the state has been written.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> SyncState {
        self.state.lock().await.clone()
    }

    async fn save(&self, state: &SyncState) -> Result<()> {
        *self.state.lock().await = state.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_batch(&self, updates: &[SyncUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let mut state = self.state.lock().await;
        state.apply(updates, Utc::now());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultsync_core::ResourceType;

    #[tokio::test]
    async fn test_batch_is_one_save() {
        let store = MemoryStateStore::new();
        let updates: Vec<SyncUpdate> = (0..50)
            .map(|i| SyncUpdate::new(ResourceType::Sessions, format!("p/{i}"), "h"))
            .collect();

        store.update_batch(&updates).await.unwrap();

        assert_eq!(store.saves(), 1);
        assert_eq!(store.load().await.count(ResourceType::Sessions), 50);
    }

    #[tokio::test]
    async fn test_empty_batch_does_not_save() {
        let store = MemoryStateStore::new();
        store.update_batch(&[]).await.unwrap();
        assert_eq!(store.saves(), 0);
    }

    #[tokio::test]
    async fn test_get_hash() {
        let store = MemoryStateStore::new();
        assert_eq!(store.get_hash(ResourceType::Agents, "x").await, None);
        store.update_one(ResourceType::Agents, "x", "h1").await.unwrap();
        assert_eq!(
            store.get_hash(ResourceType::Agents, "x").await.as_deref(),
            Some("h1")
        );
    }
}
