//! The persisted sync state structure.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vaultsync_core::ResourceType;

use crate::error::{Result, StateError};

/// Current document version.
pub const CURRENT_VERSION: u32 = 1;

/// What was transferred for one resource, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    /// Hex content hash of the bytes as transferred.
    pub content_hash: String,
    pub synced_at: DateTime<Utc>,
}

/// One pending record update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncUpdate {
    pub resource_type: ResourceType,
    pub id: String,
    pub content_hash: String,
}

impl SyncUpdate {
    pub fn new(
        resource_type: ResourceType,
        id: impl Into<String>,
        content_hash: impl Into<String>,
    ) -> Self {
        Self {
            resource_type,
            id: id.into(),
            content_hash: content_hash.into(),
        }
    }
}

/// Versioned container of every sync record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub version: u32,
    /// resource type name → id → record.
    #[serde(default)]
    pub resources: BTreeMap<String, BTreeMap<String, SyncRecord>>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self::empty()
    }
}

impl SyncState {
    /// The state of a machine that has never synced.
    pub fn empty() -> Self {
        Self {
            version: CURRENT_VERSION,
            resources: BTreeMap::new(),
        }
    }

    /// Parse a persisted document, rejecting anything this version cannot read.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let state: SyncState =
            serde_json::from_slice(bytes).map_err(|e| StateError::Corrupt(e.to_string()))?;
        if state.version != CURRENT_VERSION {
            return Err(StateError::Corrupt(format!(
                "unsupported state version {}",
                state.version
            )));
        }
        Ok(state)
    }

    /// Get the record for a resource.
    pub fn get(&self, resource_type: ResourceType, id: &str) -> Option<&SyncRecord> {
        self.resources
            .get(resource_type.as_str())
            .and_then(|records| records.get(id))
    }

    /// Get the recorded hash for a resource.
    pub fn hash_of(&self, resource_type: ResourceType, id: &str) -> Option<&str> {
        self.get(resource_type, id)
            .map(|record| record.content_hash.as_str())
    }

    /// Insert or replace a record.
    pub fn record(
        &mut self,
        resource_type: ResourceType,
        id: impl Into<String>,
        content_hash: impl Into<String>,
        synced_at: DateTime<Utc>,
    ) {
        self.resources
            .entry(resource_type.as_str().to_string())
            .or_default()
            .insert(
                id.into(),
                SyncRecord {
                    content_hash: content_hash.into(),
                    synced_at,
                },
            );
    }

    /// Apply a batch of updates, all stamped with the same time.
    pub fn apply(&mut self, updates: &[SyncUpdate], synced_at: DateTime<Utc>) {
        for update in updates {
            self.record(
                update.resource_type,
                update.id.clone(),
                update.content_hash.clone(),
                synced_at,
            );
        }
    }

    /// Number of records for a resource type.
    pub fn count(&self, resource_type: ResourceType) -> usize {
        self.resources
            .get(resource_type.as_str())
            .map_or(0, |records| records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_layout() {
        let mut state = SyncState::empty();
        let at = DateTime::parse_from_rfc3339("2026-10-16T09:12:44Z")
            .unwrap()
            .with_timezone(&Utc);
        state.record(ResourceType::Sessions, "web/4f1c", "ab12", at);

        let json: serde_json::Value = serde_json::to_value(&state).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(
            json["resources"]["sessions"]["web/4f1c"]["contentHash"],
            "ab12"
        );
        assert_eq!(
            json["resources"]["sessions"]["web/4f1c"]["syncedAt"],
            "2026-10-16T09:12:44Z"
        );
    }

    #[test]
    fn test_from_slice_rejects_bad_documents() {
        assert!(SyncState::from_slice(b"{").is_err());
        assert!(SyncState::from_slice(br#"{"resources":{}}"#).is_err());
        assert!(SyncState::from_slice(br#"{"version":7,"resources":{}}"#).is_err());
        assert!(SyncState::from_slice(br#"{"version":1,"resources":[]}"#).is_err());

        let state = SyncState::from_slice(br#"{"version":1}"#).unwrap();
        assert_eq!(state, SyncState::empty());
    }

    #[test]
    fn test_apply_overwrites() {
        let mut state = SyncState::empty();
        let now = Utc::now();
        state.apply(
            &[
                SyncUpdate::new(ResourceType::Agents, "a", "1"),
                SyncUpdate::new(ResourceType::Agents, "b", "2"),
            ],
            now,
        );
        state.apply(&[SyncUpdate::new(ResourceType::Agents, "a", "3")], now);

        assert_eq!(state.count(ResourceType::Agents), 2);
        assert_eq!(state.hash_of(ResourceType::Agents, "a"), Some("3"));
        assert_eq!(state.hash_of(ResourceType::Settings, "a"), None);
    }
}
