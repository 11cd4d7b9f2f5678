//! Strong type definitions for vaultsync.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// How a pull applies remote content to an existing local copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStrategy {
    /// Remote content replaces the local copy byte for byte.
    FullReplace,
    /// Remote content is merged into the local copy by the type's handler.
    Merge,
}

/// Static per-type configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTypeConfig {
    pub strategy: SyncStrategy,
    /// Prefix of every remote key of this type, including the trailing `/`.
    pub storage_prefix: &'static str,
}

/// The kinds of local artifacts vaultsync moves between machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// Conversation transcripts, one JSONL file per session.
    Sessions,
    /// Agent definitions, one markdown file per agent.
    Agents,
    /// The user's settings document.
    Settings,
}

impl ResourceType {
    /// Every resource type, in sync order.
    pub const ALL: [ResourceType; 3] = [Self::Sessions, Self::Agents, Self::Settings];

    /// Stable lowercase name, used as the sync state key.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sessions => "sessions",
            Self::Agents => "agents",
            Self::Settings => "settings",
        }
    }

    /// The static configuration of this type.
    pub const fn config(&self) -> ResourceTypeConfig {
        match self {
            Self::Sessions => ResourceTypeConfig {
                strategy: SyncStrategy::FullReplace,
                storage_prefix: "sessions/",
            },
            Self::Agents => ResourceTypeConfig {
                strategy: SyncStrategy::FullReplace,
                storage_prefix: "agents/",
            },
            Self::Settings => ResourceTypeConfig {
                strategy: SyncStrategy::Merge,
                storage_prefix: "settings/",
            },
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sessions" => Ok(Self::Sessions),
            "agents" => Ok(Self::Agents),
            "settings" => Ok(Self::Settings),
            other => Err(CoreError::UnknownResourceType(other.to_string())),
        }
    }
}

/// Per-item metadata carried alongside a resource.
///
/// The only label any resource type uses is the project (namespace) a
/// session transcript belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

impl TypeMetadata {
    /// Metadata labelled with a project.
    pub fn project(project: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
        }
    }

    /// Metadata recoverable from an id alone. A session id
    /// `project/session` names its project; nothing else carries any.
    pub fn from_id(resource_type: ResourceType, id: &str) -> Self {
        match (resource_type, id.split_once('/')) {
            (ResourceType::Sessions, Some((project, _))) if !project.is_empty() => {
                Self::project(project)
            }
            _ => Self::default(),
        }
    }
}

/// A locally present artifact, as discovered by a resource handler.
///
/// Never mutated; a fresh set is produced on every enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceItem {
    /// Logical id, unique within its resource type.
    pub id: String,
    /// Physical location, if the item is file-backed.
    pub location: Option<PathBuf>,
    pub last_modified: Option<DateTime<Utc>>,
    pub metadata: TypeMetadata,
}

impl ResourceItem {
    /// The part of the id after the last `/` (the whole id if it has none).
    pub fn basename(&self) -> &str {
        basename(&self.id)
    }
}

/// An artifact as listed by a backend. Recomputed on every pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResourceDescriptor {
    pub id: String,
    pub resource_type: ResourceType,
    /// Filled in by the pull orchestrator; backends always report `false`.
    pub exists_locally: bool,
    pub metadata: Option<TypeMetadata>,
}

impl RemoteResourceDescriptor {
    pub fn new(resource_type: ResourceType, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type,
            exists_locally: false,
            metadata: None,
        }
    }

    /// Descriptor for a listed remote key, with metadata derived from the id.
    pub fn listed(resource_type: ResourceType, id: impl Into<String>) -> Self {
        let id = id.into();
        let metadata = TypeMetadata::from_id(resource_type, &id);
        Self {
            metadata: Some(metadata),
            ..Self::new(resource_type, id)
        }
    }
}

/// The part of an id after the last `/`.
pub fn basename(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_roundtrip() {
        for rt in ResourceType::ALL {
            assert_eq!(rt.as_str().parse::<ResourceType>().unwrap(), rt);
        }
        assert!("projects".parse::<ResourceType>().is_err());
    }

    #[test]
    fn test_only_settings_merges() {
        assert_eq!(ResourceType::Settings.config().strategy, SyncStrategy::Merge);
        assert_eq!(
            ResourceType::Sessions.config().strategy,
            SyncStrategy::FullReplace
        );
        assert_eq!(ResourceType::Agents.config().storage_prefix, "agents/");
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("proj/abc"), "abc");
        assert_eq!(basename("a/b/c"), "c");
        assert_eq!(basename("abc"), "abc");
    }

    #[test]
    fn test_metadata_serialization_omits_empty() {
        let json = serde_json::to_string(&TypeMetadata::default()).unwrap();
        assert_eq!(json, "{}");
        let json = serde_json::to_string(&TypeMetadata::project("web")).unwrap();
        assert_eq!(json, r#"{"project":"web"}"#);
    }

    #[test]
    fn test_listed_descriptor_derives_session_project() {
        let listed = RemoteResourceDescriptor::listed(ResourceType::Sessions, "web/s1");
        assert_eq!(listed.metadata, Some(TypeMetadata::project("web")));
        assert!(!listed.exists_locally);

        let bare = RemoteResourceDescriptor::listed(ResourceType::Sessions, "s1");
        assert_eq!(bare.metadata, Some(TypeMetadata::default()));

        let agent = RemoteResourceDescriptor::listed(ResourceType::Agents, "team/reviewer");
        assert_eq!(agent.metadata, Some(TypeMetadata::default()));
    }
}
