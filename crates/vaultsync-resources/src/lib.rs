//! # vaultsync Resources
//!
//! The local side of synchronization: one [`ResourceHandler`] per resource
//! type, mapping logical ids to files under the user's `~/.claude`
//! directory.
//!
//! ## Handlers
//!
//! | Type | Location | Id | Strategy |
//! |------|----------|----|----------|
//! | sessions | `projects/<project>/<session>.jsonl` | `<project>/<session>` | full replace |
//! | agents | `agents/<name>.md` | `<name>` | full replace |
//! | settings | `settings.json` | `settings` | merge |
//!
//! ## Change Detection
//!
//! [`ResourceHandler::enumerate_local`] is shared by every handler. With
//! the change filter set it hashes each file and compares against the sync
//! state; empty files are never reported.

pub mod agent;
pub mod error;
pub mod session;
pub mod set;
pub mod settings;
pub mod traits;

pub use agent::AgentHandler;
pub use error::{ResourceError, Result};
pub use session::SessionHandler;
pub use set::HandlerSet;
pub use settings::{SettingsHandler, SETTINGS_ID};
pub use traits::{conflict_path, ResourceHandler};
