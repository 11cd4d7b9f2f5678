//! Agent definitions: `<claude_dir>/agents/<name>.md`.

use std::path::PathBuf;

use async_trait::async_trait;
use vaultsync_core::{ResourceItem, ResourceType, TypeMetadata};

use crate::error::Result;
use crate::traits::{
    check_segment, file_item, is_conflict_copy, is_file, read_dir_entries, ResourceHandler,
};

const EXTENSION: &str = "md";

/// Handler for agent definitions. The id is the file stem.
#[derive(Debug, Clone)]
pub struct AgentHandler {
    agents_dir: PathBuf,
}

impl AgentHandler {
    pub fn new(claude_dir: impl Into<PathBuf>) -> Self {
        Self {
            agents_dir: claude_dir.into().join("agents"),
        }
    }
}

#[async_trait]
impl ResourceHandler for AgentHandler {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Agents
    }

    async fn discover(&self) -> Result<Vec<ResourceItem>> {
        let mut items = Vec::new();
        for entry in read_dir_entries(&self.agents_dir).await? {
            let path = entry.path();
            if !is_file(&entry).await || path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if is_conflict_copy(&path) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            items.push(file_item(name, path, TypeMetadata::default()).await?);
        }
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    fn resolve_storage_location(&self, id: &str, _metadata: &TypeMetadata) -> Result<PathBuf> {
        check_segment(ResourceType::Agents, id, id)?;
        Ok(self.agents_dir.join(format!("{id}.{EXTENSION}")))
    }
}
