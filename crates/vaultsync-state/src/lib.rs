//! # vaultsync State
//!
//! The Sync State Store: a durable record of what was last transferred.
//!
//! ## Overview
//!
//! For every `(resource type, id)` that has been pushed or pulled at least
//! once, the store holds the content hash of the bytes as they were
//! transferred and when that happened. The push side uses it to find
//! changed items; nothing else in the system owns this data.
//!
//! ## Key Types
//!
//! - [`StateStore`] - The async trait every store implements
//! - [`JsonStateStore`] - Versioned JSON document on disk, written atomically
//! - [`MemoryStateStore`] - In-memory store for tests
//! - [`SyncState`] / [`SyncRecord`] - The persisted structure
//!
//! ## Persisted Layout
//!
//! ```json
//! {
//!   "version": 1,
//!   "resources": {
//!     "sessions": {
//!       "-home-me-web/4f1c": {
//!         "contentHash": "9f2c…",
//!         "syncedAt": "2026-10-16T09:12:44Z"
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Never fails to load**: a missing, unreadable or unparseable document
//!   is the empty state. Corruption means "nothing synced yet".
//! - **Whole-document writes**: updates load, merge and save under one lock,
//!   and a batch of updates is saved once.
//! - **Single process**: the lock serializes callers inside one process;
//!   several processes writing the same file are not supported.

pub mod error;
pub mod json;
pub mod memory;
pub mod model;
pub mod traits;

pub use error::{Result, StateError};
pub use json::JsonStateStore;
pub use memory::MemoryStateStore;
pub use model::{SyncRecord, SyncState, SyncUpdate, CURRENT_VERSION};
pub use traits::StateStore;
