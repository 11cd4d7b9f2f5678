//! Session transcripts: `<claude_dir>/projects/<project>/<session>.jsonl`.

use std::path::PathBuf;

use async_trait::async_trait;
use vaultsync_core::{ResourceItem, ResourceType, TypeMetadata};

use crate::error::{ResourceError, Result};
use crate::traits::{
    check_segment, file_item, is_conflict_copy, is_dir, is_file, read_dir_entries,
    ResourceHandler,
};

const EXTENSION: &str = "jsonl";

/// Handler for session transcripts.
///
/// The id is `"<project>/<session>"`; the project is also carried as
/// metadata. An id without a project segment resolves through the
/// metadata label instead.
#[derive(Debug, Clone)]
pub struct SessionHandler {
    projects_dir: PathBuf,
}

impl SessionHandler {
    pub fn new(claude_dir: impl Into<PathBuf>) -> Self {
        Self {
            projects_dir: claude_dir.into().join("projects"),
        }
    }

    fn split_id<'a>(&self, id: &'a str, metadata: &'a TypeMetadata) -> Result<(&'a str, &'a str)> {
        let (project, session) = match id.split_once('/') {
            Some(parts) => parts,
            None => match metadata.project.as_deref() {
                Some(project) => (project, id),
                None => return Err(ResourceError::invalid_id(ResourceType::Sessions, id)),
            },
        };
        check_segment(ResourceType::Sessions, id, project)?;
        check_segment(ResourceType::Sessions, id, session)?;
        Ok((project, session))
    }
}

#[async_trait]
impl ResourceHandler for SessionHandler {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Sessions
    }

    async fn discover(&self) -> Result<Vec<ResourceItem>> {
        let mut items = Vec::new();
        for project_entry in read_dir_entries(&self.projects_dir).await? {
            if !is_dir(&project_entry).await {
                continue;
            }
            let project_dir = project_entry.path();
            let Some(project) = project_entry.file_name().to_str().map(str::to_string) else {
                continue;
            };

            for entry in read_dir_entries(&project_dir).await? {
                let path = entry.path();
                if !is_file(&entry).await || path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                    continue;
                }
                if is_conflict_copy(&path) {
                    continue;
                }
                let Some(session) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let id = format!("{project}/{session}");
                items.push(file_item(id, path.clone(), TypeMetadata::project(&project)).await?);
            }
        }
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    fn resolve_storage_location(&self, id: &str, metadata: &TypeMetadata) -> Result<PathBuf> {
        let (project, session) = self.split_id(id, metadata)?;
        Ok(self
            .projects_dir
            .join(project)
            .join(format!("{session}.{EXTENSION}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vaultsync_state::{MemoryStateStore, StateStore};

    async fn write(dir: &TempDir, rel: &str, body: &str) {
        let path = dir.path().join(rel);
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(path, body).await.unwrap();
    }

    #[tokio::test]
    async fn test_discover_ids_and_metadata() {
        let dir = TempDir::new().unwrap();
        write(&dir, "projects/-home-me-web/abc.jsonl", "{}\n").await;
        write(&dir, "projects/-home-me-web/notes.txt", "x").await;
        write(&dir, "projects/api/def.jsonl", "{}\n").await;
        write(&dir, "projects/api/def.conflict.jsonl", "{}\n").await;
        let handler = SessionHandler::new(dir.path());

        let items = handler.discover().await.unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();

        assert_eq!(ids, vec!["-home-me-web/abc", "api/def"]);
        assert_eq!(items[0].metadata, TypeMetadata::project("-home-me-web"));
        assert!(items[0].last_modified.is_some());
    }

    #[tokio::test]
    async fn test_location_inverts_discovery() {
        let dir = TempDir::new().unwrap();
        write(&dir, "projects/web/abc.jsonl", "{}\n").await;
        let handler = SessionHandler::new(dir.path());

        for item in handler.discover().await.unwrap() {
            let resolved = handler
                .resolve_storage_location(&item.id, &item.metadata)
                .unwrap();
            assert_eq!(Some(resolved), item.location);
        }
    }

    #[test]
    fn test_bare_id_resolves_through_metadata() {
        let handler = SessionHandler::new("/c");
        let path = handler
            .resolve_storage_location("abc", &TypeMetadata::project("web"))
            .unwrap();
        assert_eq!(path, PathBuf::from("/c/projects/web/abc.jsonl"));

        assert!(handler
            .resolve_storage_location("abc", &TypeMetadata::default())
            .is_err());
    }

    #[test]
    fn test_rejects_traversal() {
        let handler = SessionHandler::new("/c");
        let meta = TypeMetadata::default();
        assert!(handler.resolve_storage_location("../x", &meta).is_err());
        assert!(handler.resolve_storage_location("web/../../x", &meta).is_err());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let handler = SessionHandler::new(dir.path());

        let path = handler
            .write_local("web/new", b"{\"a\":1}\n", &TypeMetadata::project("web"))
            .await
            .unwrap();
        assert!(path.ends_with("projects/web/new.jsonl"));

        let items = handler.discover().await.unwrap();
        assert_eq!(handler.read_local(&items[0]).await.unwrap(), b"{\"a\":1}\n");
    }

    #[tokio::test]
    async fn test_enumerate_skips_empty_and_filters_unchanged() {
        let dir = TempDir::new().unwrap();
        write(&dir, "projects/web/empty.jsonl", "").await;
        write(&dir, "projects/web/same.jsonl", "same\n").await;
        write(&dir, "projects/web/new.jsonl", "new\n").await;
        let handler = SessionHandler::new(dir.path());

        let state = MemoryStateStore::new();
        let same_hash = vaultsync_core::content_hash(b"same\n").to_hex();
        state
            .update_one(ResourceType::Sessions, "web/same", &same_hash)
            .await
            .unwrap();
        state
            .update_one(ResourceType::Sessions, "web/empty", "whatever")
            .await
            .unwrap();

        let all: Vec<String> = handler
            .enumerate_local(false, &state)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(all, vec!["web/new", "web/same"]);

        let changed: Vec<String> = handler
            .enumerate_local(true, &state)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(changed, vec!["web/new"]);
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let handler = SessionHandler::new("/nonexistent-vaultsync-root");
        let item = ResourceItem {
            id: "web/gone".into(),
            location: None,
            last_modified: None,
            metadata: TypeMetadata::default(),
        };
        assert!(handler.read_local(&item).await.unwrap_err().is_not_found());
    }
}
