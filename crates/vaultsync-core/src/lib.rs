//! # vaultsync Core
//!
//! Pure primitives for vaultsync: resource types, content hashing, remote key
//! escaping and structured merge.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`ResourceType`] - The kinds of local artifacts that are synchronized
//! - [`ResourceTypeConfig`] - Static per-type sync strategy and storage prefix
//! - [`ResourceItem`] - A locally discovered artifact instance
//! - [`RemoteResourceDescriptor`] - An artifact as listed by a backend
//! - [`ContentHash`] - BLAKE3 fingerprint used for change and conflict detection
//!
//! ## Change Detection
//!
//! Nothing in vaultsync compares timestamps. An artifact has changed when
//! the hash of its bytes differs from the hash recorded at the last
//! successful transfer. See [`content_hash`].

pub mod error;
pub mod escape;
pub mod hash;
pub mod merge;
pub mod types;

pub use error::{CoreError, Result};
pub use escape::{escape_id, id_from_remote_key, remote_key, unescape_id, REMOTE_SUFFIX};
pub use hash::{content_hash, ContentHash};
pub use merge::{merge_json, merge_values};
pub use types::{
    basename, RemoteResourceDescriptor, ResourceItem, ResourceType, ResourceTypeConfig, SyncStrategy,
    TypeMetadata,
};
