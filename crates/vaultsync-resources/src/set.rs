//! The handler registry.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use vaultsync_core::ResourceType;

use crate::agent::AgentHandler;
use crate::session::SessionHandler;
use crate::settings::SettingsHandler;
use crate::traits::ResourceHandler;

/// One handler per resource type.
#[derive(Clone)]
pub struct HandlerSet {
    handlers: BTreeMap<ResourceType, Arc<dyn ResourceHandler>>,
}

impl HandlerSet {
    /// The standard handlers, all rooted at `claude_dir`.
    pub fn new(claude_dir: impl Into<PathBuf>) -> Self {
        let claude_dir = claude_dir.into();
        Self::empty()
            .with(Arc::new(SessionHandler::new(&claude_dir)))
            .with(Arc::new(AgentHandler::new(&claude_dir)))
            .with(Arc::new(SettingsHandler::new(&claude_dir)))
    }

    /// A set with no handlers.
    pub fn empty() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Register (or replace) the handler for its type.
    pub fn with(mut self, handler: Arc<dyn ResourceHandler>) -> Self {
        self.handlers.insert(handler.resource_type(), handler);
        self
    }

    pub fn get(&self, resource_type: ResourceType) -> Option<Arc<dyn ResourceHandler>> {
        self.handlers.get(&resource_type).cloned()
    }

    /// Registered types, in sync order.
    pub fn types(&self) -> Vec<ResourceType> {
        self.handlers.keys().copied().collect()
    }
}

impl std::fmt::Debug for HandlerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerSet")
            .field("types", &self.types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_set_covers_every_type() {
        let set = HandlerSet::new("/c");
        assert_eq!(set.types(), ResourceType::ALL.to_vec());
        for rt in ResourceType::ALL {
            assert_eq!(set.get(rt).unwrap().resource_type(), rt);
        }
        assert!(HandlerSet::empty().get(ResourceType::Agents).is_none());
    }
}
