//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use vaultsync::{SyncContext, SyncEngine};
use vaultsync_backend::MemoryBackend;
use vaultsync_crypto::{ChaChaCipher, Cipher, CryptoError, EncryptionKey};
use vaultsync_resources::HandlerSet;
use vaultsync_state::MemoryStateStore;

/// Key shared by every fixture unless one is given explicitly.
pub const TEST_KEY: [u8; 32] = [0x42; 32];

/// A cipher over [`TEST_KEY`].
pub fn test_cipher() -> Arc<dyn Cipher> {
    Arc::new(ChaChaCipher::new(EncryptionKey::from_bytes(TEST_KEY)))
}

/// One machine: a Claude directory, its sync state, and an engine.
///
/// The backend and cipher are shared with [`TestEnv::sibling`]s so that
/// several machines can sync through the same remote.
pub struct TestEnv {
    pub dir: TempDir,
    pub backend: Arc<MemoryBackend>,
    pub state: Arc<MemoryStateStore>,
    pub cipher: Arc<dyn Cipher>,
    pub engine: SyncEngine,
}

impl TestEnv {
    /// A fresh machine with an empty remote.
    pub fn new() -> Self {
        Self::with_cipher(test_cipher())
    }

    /// A fresh machine with an empty remote and the given cipher.
    pub fn with_cipher(cipher: Arc<dyn Cipher>) -> Self {
        Self::build(Arc::new(MemoryBackend::new()), cipher)
    }

    /// Another machine on the same remote and key, with its own
    /// directory and state.
    pub fn sibling(&self) -> Self {
        Self::build(self.backend.clone(), self.cipher.clone())
    }

    fn build(backend: Arc<MemoryBackend>, cipher: Arc<dyn Cipher>) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let state = Arc::new(MemoryStateStore::new());
        let ctx = SyncContext::new(backend.clone(), state.clone(), cipher.clone());
        let engine = SyncEngine::new(ctx, HandlerSet::new(dir.path()));
        Self {
            dir,
            backend,
            state,
            cipher,
            engine,
        }
    }

    /// Root of this machine's Claude directory.
    pub fn claude_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of `relative` under the Claude directory.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Write `projects/<project>/<session>.jsonl`.
    pub fn write_session(&self, project: &str, session: &str, content: impl AsRef<[u8]>) -> io::Result<PathBuf> {
        self.write(format!("projects/{project}/{session}.jsonl"), content)
    }

    /// Write `agents/<name>.md`.
    pub fn write_agent(&self, name: &str, content: impl AsRef<[u8]>) -> io::Result<PathBuf> {
        self.write(format!("agents/{name}.md"), content)
    }

    /// Write `settings.json`.
    pub fn write_settings(&self, content: impl AsRef<[u8]>) -> io::Result<PathBuf> {
        self.write("settings.json", content)
    }

    /// Write an arbitrary file, creating parent directories.
    pub fn write(&self, relative: impl AsRef<Path>, content: impl AsRef<[u8]>) -> io::Result<PathBuf> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Read a file under the Claude directory, `None` if absent.
    pub fn read(&self, relative: impl AsRef<Path>) -> Option<Vec<u8>> {
        std::fs::read(self.path(relative)).ok()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// A cipher that refuses to encrypt any payload containing a marker.
///
/// Everything else is delegated to the wrapped cipher.
pub struct FailingCipher {
    inner: Arc<dyn Cipher>,
    marker: Vec<u8>,
}

impl FailingCipher {
    pub fn new(inner: Arc<dyn Cipher>, marker: impl Into<Vec<u8>>) -> Self {
        Self {
            inner,
            marker: marker.into(),
        }
    }

    fn poisoned(&self, plaintext: &[u8]) -> bool {
        !self.marker.is_empty()
            && plaintext
                .windows(self.marker.len())
                .any(|window| window == self.marker.as_slice())
    }
}

impl Cipher for FailingCipher {
    fn encrypt(&self, plaintext: &[u8]) -> vaultsync_crypto::Result<Vec<u8>> {
        if self.poisoned(plaintext) {
            return Err(CryptoError::Encryption("simulated failure".into()));
        }
        self.inner.encrypt(plaintext)
    }

    fn decrypt(&self, sealed: &[u8]) -> vaultsync_crypto::Result<Vec<u8>> {
        self.inner.decrypt(sealed)
    }
}
