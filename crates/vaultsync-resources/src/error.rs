//! Error types for the resources module.

use std::path::PathBuf;

use thiserror::Error;
use vaultsync_core::ResourceType;

/// Errors that can occur while reading or writing local artifacts.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The artifact's storage location no longer exists.
    #[error("{resource_type} {id} not found locally")]
    NotFound {
        resource_type: ResourceType,
        id: String,
    },

    /// The id cannot be mapped to a location inside the resource root.
    #[error("invalid {resource_type} id: {id:?}")]
    InvalidId {
        resource_type: ResourceType,
        id: String,
    },

    /// I/O error at a specific path.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ResourceError {
    pub fn invalid_id(resource_type: ResourceType, id: impl Into<String>) -> Self {
        Self::InvalidId {
            resource_type,
            id: id.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for resource operations.
pub type Result<T> = std::result::Result<T, ResourceError>;
