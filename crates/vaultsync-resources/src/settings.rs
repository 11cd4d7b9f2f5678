//! The settings document: `<claude_dir>/settings.json`.

use std::path::PathBuf;

use async_trait::async_trait;
use vaultsync_core::{merge_json, ResourceItem, ResourceType, TypeMetadata};

use crate::error::{ResourceError, Result};
use crate::traits::{file_item, ResourceHandler};

/// The single id of the settings resource.
pub const SETTINGS_ID: &str = "settings";

/// Handler for the settings document.
///
/// Settings merge rather than replace: see [`vaultsync_core::merge_json`].
/// A keep-both copy is written next to it as `settings.remote.json`, which
/// discovery never picks up.
#[derive(Debug, Clone)]
pub struct SettingsHandler {
    claude_dir: PathBuf,
}

impl SettingsHandler {
    pub fn new(claude_dir: impl Into<PathBuf>) -> Self {
        Self {
            claude_dir: claude_dir.into(),
        }
    }

    fn check_id(id: &str) -> Result<()> {
        if id == SETTINGS_ID {
            Ok(())
        } else {
            Err(ResourceError::invalid_id(ResourceType::Settings, id))
        }
    }
}

#[async_trait]
impl ResourceHandler for SettingsHandler {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Settings
    }

    async fn discover(&self) -> Result<Vec<ResourceItem>> {
        let path = self.claude_dir.join("settings.json");
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Ok(Vec::new()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ResourceError::Io { path, source: e }),
        }
        Ok(vec![
            file_item(SETTINGS_ID.to_string(), path, TypeMetadata::default()).await?,
        ])
    }

    fn resolve_storage_location(&self, id: &str, _metadata: &TypeMetadata) -> Result<PathBuf> {
        Self::check_id(id)?;
        Ok(self.claude_dir.join("settings.json"))
    }

    fn resolve_conflict_location(&self, id: &str, _metadata: &TypeMetadata) -> Result<PathBuf> {
        Self::check_id(id)?;
        Ok(self.claude_dir.join("settings.remote.json"))
    }

    fn merge(&self, local: &[u8], remote: &[u8]) -> Option<Vec<u8>> {
        Some(merge_json(local, remote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_discover_single_document() {
        let dir = TempDir::new().unwrap();
        let handler = SettingsHandler::new(dir.path());
        assert!(handler.discover().await.unwrap().is_empty());

        tokio::fs::write(dir.path().join("settings.json"), "{}").await.unwrap();
        tokio::fs::write(dir.path().join("settings.remote.json"), "{}").await.unwrap();

        let items = handler.discover().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, SETTINGS_ID);
    }

    #[test]
    fn test_conflict_copy_is_remote_json() {
        let handler = SettingsHandler::new("/c");
        let meta = TypeMetadata::default();
        assert_eq!(
            handler.resolve_conflict_location(SETTINGS_ID, &meta).unwrap(),
            PathBuf::from("/c/settings.remote.json")
        );
        assert!(handler.resolve_storage_location("other", &meta).is_err());
    }

    #[test]
    fn test_merge_prefers_local_scalars_and_unions_arrays() {
        let handler = SettingsHandler::new("/c");
        let local = br#"{"tags":["a"],"mode":"x"}"#;
        let remote = br#"{"tags":["b"],"mode":"y","extra":true}"#;

        let merged = handler.merge(local, remote).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&merged).unwrap();

        assert_eq!(value["mode"], json!("x"));
        assert_eq!(value["extra"], json!(true));
        let mut tags: Vec<String> = serde_json::from_value(value["tags"].clone()).unwrap();
        tags.sort();
        assert_eq!(tags, vec!["a", "b"]);
    }
}
