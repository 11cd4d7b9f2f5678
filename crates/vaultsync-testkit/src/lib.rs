//! # vaultsync testkit
//!
//! Testing utilities for vaultsync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a throwaway Claude directory wired to an in-memory
//!   backend and state store, plus helpers to lay down artifacts
//! - **Failing collaborators**: a cipher that refuses selected payloads,
//!   for exercising per-item failure isolation
//! - **Generators**: proptest strategies for ids, payloads and settings
//!
//! End-to-end scenarios live in this crate's `tests/` directory.
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use vaultsync::PushOptions;
//! use vaultsync::core::ResourceType;
//! use vaultsync_testkit::TestEnv;
//!
//! # async fn example() -> std::io::Result<()> {
//! let env = TestEnv::new();
//! env.write_agent("reviewer", "# Reviewer")?;
//! let report = env
//!     .engine
//!     .push(ResourceType::Agents, &PushOptions::default())
//!     .await
//!     .unwrap();
//! assert_eq!(report.pushed, 1);
//!
//! // A second machine sharing the same remote and key.
//! let laptop = env.sibling();
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! Call [`init_tracing`] at the top of a test to see engine logs. The
//! filter comes from `RUST_LOG` and defaults to `warn`.

pub mod fixtures;
pub mod generators;

pub use fixtures::{test_cipher, FailingCipher, TestEnv, TEST_KEY};

use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber. Safe to call from every test.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
