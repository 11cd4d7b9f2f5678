//! # vaultsync
//!
//! Encrypted synchronization of locally generated Claude artifacts (session
//! transcripts, agent definitions, settings) across machines, through
//! storage that is never trusted with plaintext.
//!
//! ## Overview
//!
//! - **Push**: enumerate local items whose content hash differs from the
//!   last recorded sync, encrypt them, hand them to the backend in one bulk
//!   call, and record hashes only for what the backend confirmed.
//! - **Pull**: list the remote, pull ids missing locally, and on request
//!   compare the ones present on both sides. Differing content is a
//!   conflict, resolved as keep-local, keep-remote or keep-both.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vaultsync::{PullOptions, PushOptions, SyncConfig, SyncEngine};
//!
//! async fn example() -> vaultsync::Result<()> {
//!     let config = SyncConfig::load("/home/me/.vaultsync/config.json")?;
//!     let engine = SyncEngine::open(&config).await?;
//!
//!     for report in engine.push_all(&PushOptions::default()).await? {
//!         println!("{}", report.summary(false));
//!     }
//!
//!     let pull = PullOptions { reconcile: true, ..Default::default() };
//!     let report = engine
//!         .pull(vaultsync::core::ResourceType::Settings, &pull)
//!         .await?;
//!     println!("{}", report.summary(true));
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - One machine syncs at a time. Divergence is resolved at pull time; there
//!   is no locking against concurrent writers on other machines.
//! - Per-item failures never abort an operation. They are counted and
//!   listed in the report. Only setup problems return an error.
//!
//! ## Re-exports
//!
//! - `vaultsync::core` - resource types, hashing, key escaping, merge
//! - `vaultsync::crypto` - the cipher and key handling
//! - `vaultsync::state` - sync state stores
//! - `vaultsync::backend` - git, S3 and memory backends
//! - `vaultsync::resources` - local resource handlers

pub mod config;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod pull;
pub mod push;
pub mod report;

pub use vaultsync_backend as backend;
pub use vaultsync_core as core;
pub use vaultsync_crypto as crypto;
pub use vaultsync_resources as resources;
pub use vaultsync_state as state;

pub use config::{BackendConfig, SyncConfig, DEFAULT_BATCH_SIZE};
pub use conflict::{
    Conflict, ConflictResolver, FixedResolver, LocalIndex, LocalMatch, Resolution,
};
pub use engine::{SyncContext, SyncEngine};
pub use error::{EngineError, Result};
pub use pull::PullOptions;
pub use push::PushOptions;
pub use report::{ConflictSummary, ItemFailure, PullReport, PushReport};
