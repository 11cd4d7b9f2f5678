//! # vaultsync Backend
//!
//! Remote storage for encrypted payloads.
//!
//! ## Overview
//!
//! A backend stores opaque ciphertext keyed by `(resource type, id)`. It
//! never sees plaintext and never decides what to sync; the orchestrators
//! do that. Every implementation lays objects out the same way:
//!
//! ```text
//! {storage_prefix}{escape_id(id)}.enc
//! sessions/-home-me-web%2F4f1c.enc
//! agents/reviewer.enc
//! settings/settings.enc
//! ```
//!
//! ## Implementations
//!
//! - [`GitBackend`] - a working clone of a git repository; a bulk push is one
//!   commit and one `git push`
//! - [`S3Backend`] - an S3-compatible bucket; a bulk push is concurrent PUTs
//! - [`MemoryBackend`] - in-process map for tests, with failure injection
//!
//! ## Push Gate
//!
//! Every push path runs [`ensure_encrypted`] before anything is written.
//! Plaintext reaching a backend is a [`BackendError::SecurityViolation`]:
//! fatal for `push_one`, a per-item failure inside `push_many`.

pub mod error;
pub mod git;
pub mod memory;
pub mod s3;
pub mod traits;

pub use error::{BackendError, Result};
pub use git::{GitBackend, GitBackendConfig};
pub use memory::MemoryBackend;
pub use s3::{S3Backend, S3BackendConfig};
pub use traits::{
    ensure_encrypted, Backend, ItemError, ProgressFn, PushItem, PushManyResult, PushProgress,
    PULL_CONCURRENCY,
};
