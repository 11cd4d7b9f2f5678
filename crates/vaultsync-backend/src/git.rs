//! Git repository backend.
//!
//! Objects are files in a working clone of a remote repository, laid out by
//! remote key. Every write first integrates the remote branch, then commits
//! and pushes. Listings integrate first too, so they reflect the remote.
//!
//! Machines take turns on the same branch. When the local branch has
//! commits the remote lacks (an earlier push failed after committing), they
//! are replayed on top of the remote branch. Objects are whole files under
//! unique keys, so replaying is a tree update and the local copy of a key
//! wins.
//!
//! libgit2 calls are blocking, so every repository operation runs on
//! `tokio::task::spawn_blocking` with a freshly opened `Repository`.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use git2::build::{CheckoutBuilder, TreeUpdateBuilder};
use git2::{
    BranchType, Commit, Cred, CredentialType, Delta, ErrorCode, FetchOptions, FileMode, Oid,
    PushOptions, RemoteCallbacks, Repository, Signature,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vaultsync_core::{
    id_from_remote_key, remote_key, RemoteResourceDescriptor, ResourceType, TypeMetadata,
};

use crate::error::{BackendError, Result};
use crate::traits::{
    ensure_encrypted, Backend, ItemError, ProgressFn, PushItem, PushManyResult, PushProgress,
};

const MAX_CREDENTIAL_ATTEMPTS: u32 = 3;

/// Pushes attempted per write when the remote keeps moving.
const MAX_PUSH_ATTEMPTS: u32 = 3;

fn default_remote() -> String {
    "origin".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_author_name() -> String {
    "vaultsync".to_string()
}

fn default_author_email() -> String {
    "vaultsync@localhost".to_string()
}

/// Configuration for [`GitBackend`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitBackendConfig {
    /// Working clone that holds the objects.
    pub repo_dir: PathBuf,
    #[serde(default = "default_remote")]
    pub remote: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_author_name")]
    pub author_name: String,
    #[serde(default = "default_author_email")]
    pub author_email: String,
}

impl GitBackendConfig {
    /// Config with default remote (`origin`), branch (`main`) and author.
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            remote: default_remote(),
            branch: default_branch(),
            author_name: default_author_name(),
            author_email: default_author_email(),
        }
    }

    fn branch_ref(&self) -> String {
        format!("refs/heads/{}", self.branch)
    }

    fn tracking_ref(&self) -> String {
        format!("refs/remotes/{}/{}", self.remote, self.branch)
    }
}

/// A staged change, as a path relative to the repository root.
enum Change {
    Write(String),
    Remove(String),
}

/// Backend over a working clone of a git repository.
pub struct GitBackend {
    config: Arc<GitBackendConfig>,
}

impl GitBackend {
    /// Open an existing working clone.
    ///
    /// Fails with `NotConfigured` if the directory is not a non-bare
    /// repository or the configured remote is missing.
    pub fn open(config: GitBackendConfig) -> Result<Self> {
        let repo = Repository::open(&config.repo_dir).map_err(|e| {
            BackendError::NotConfigured(format!(
                "{} is not a git repository: {}",
                config.repo_dir.display(),
                e.message()
            ))
        })?;
        if repo.is_bare() {
            return Err(BackendError::NotConfigured(format!(
                "{} is a bare repository",
                config.repo_dir.display()
            )));
        }
        if repo.find_remote(&config.remote).is_err() {
            return Err(BackendError::NotConfigured(format!(
                "remote {} not found in {}",
                config.remote,
                config.repo_dir.display()
            )));
        }
        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &GitBackendConfig {
        &self.config
    }

    async fn write_object(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.config.repo_dir.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    /// Run `f` against the repository on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Repository, &GitBackendConfig) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let config = Arc::clone(&self.config);
        tokio::task::spawn_blocking(move || {
            let repo = Repository::open(&config.repo_dir)?;
            f(&repo, &config)
        })
        .await
        .map_err(|e| BackendError::Task(e.to_string()))?
    }
}

#[async_trait]
impl Backend for GitBackend {
    fn name(&self) -> &'static str {
        "git"
    }

    async fn push_one(
        &self,
        resource_type: ResourceType,
        id: &str,
        ciphertext: &[u8],
        _metadata: &TypeMetadata,
    ) -> Result<()> {
        ensure_encrypted(id, ciphertext)?;
        self.blocking(fetch_and_integrate).await?;
        let key = remote_key(resource_type, id);
        self.write_object(&key, ciphertext).await?;

        let message = format!("vaultsync: push {resource_type} {id}");
        let changes = vec![Change::Write(key)];
        self.blocking(move |repo, config| commit_and_push(repo, config, &changes, &message))
            .await
    }

    async fn push_many(
        &self,
        resource_type: ResourceType,
        items: Vec<PushItem>,
        progress: Option<&ProgressFn<'_>>,
    ) -> Result<PushManyResult> {
        let total = items.len();
        let mut result = PushManyResult::default();
        let mut written = Vec::with_capacity(total);

        if let Err(e) = self.blocking(fetch_and_integrate).await {
            warn!(error = %e, count = total, "could not bring clone up to date");
            let text = e.to_string();
            result.failed = items
                .into_iter()
                .map(|item| ItemError::new(item.id, &text))
                .collect();
            return Ok(result);
        }

        for (i, item) in items.into_iter().enumerate() {
            let key = remote_key(resource_type, &item.id);
            let outcome = match ensure_encrypted(&item.id, &item.ciphertext) {
                Ok(()) => self.write_object(&key, &item.ciphertext).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => written.push((item.id, key)),
                Err(e) => {
                    warn!(id = %item.id, error = %e, "skipping item in bulk push");
                    result.failed.push(ItemError::new(item.id, e));
                }
            }
            if let Some(progress) = progress {
                progress(PushProgress {
                    completed: i + 1,
                    total,
                });
            }
        }

        if written.is_empty() {
            return Ok(result);
        }

        let changes: Vec<Change> = written
            .iter()
            .map(|(_, key)| Change::Write(key.clone()))
            .collect();
        let message = format!("vaultsync: push {} {}", written.len(), resource_type);
        match self
            .blocking(move |repo, config| commit_and_push(repo, config, &changes, &message))
            .await
        {
            Ok(()) => result.pushed.extend(written.into_iter().map(|(id, _)| id)),
            Err(e) => {
                warn!(error = %e, count = written.len(), "bulk commit/push failed");
                let text = e.to_string();
                result
                    .failed
                    .extend(written.into_iter().map(|(id, _)| ItemError::new(id, &text)));
            }
        }
        Ok(result)
    }

    async fn pull_one(&self, resource_type: ResourceType, id: &str) -> Result<Vec<u8>> {
        let path = self.config.repo_dir.join(remote_key(resource_type, id));
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BackendError::not_found(resource_type, id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_all(&self, resource_type: ResourceType) -> Result<Vec<RemoteResourceDescriptor>> {
        self.blocking(fetch_and_integrate).await?;

        let prefix = resource_type.config().storage_prefix;
        let dir = self.config.repo_dir.join(prefix);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut descriptors = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if let Some(id) = id_from_remote_key(resource_type, &format!("{prefix}{name}"))? {
                descriptors.push(RemoteResourceDescriptor::listed(resource_type, id));
            }
        }
        descriptors.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(%resource_type, count = descriptors.len(), "listed git objects");
        Ok(descriptors)
    }

    async fn delete_one(&self, resource_type: ResourceType, id: &str) -> Result<()> {
        self.blocking(fetch_and_integrate).await?;
        let key = remote_key(resource_type, id);
        match tokio::fs::remove_file(self.config.repo_dir.join(&key)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BackendError::not_found(resource_type, id));
            }
            Err(e) => return Err(e.into()),
        }

        let message = format!("vaultsync: delete {resource_type} {id}");
        let changes = vec![Change::Remove(key)];
        self.blocking(move |repo, config| commit_and_push(repo, config, &changes, &message))
            .await
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Blocking repository operations
// ─────────────────────────────────────────────────────────────────────────

fn commit_and_push(
    repo: &Repository,
    config: &GitBackendConfig,
    changes: &[Change],
    message: &str,
) -> Result<()> {
    commit(repo, config, changes, message)?;

    // Always push: earlier commits may not have reached the remote.
    let mut attempt = 1;
    loop {
        match push(repo, config) {
            Ok(()) => return Ok(()),
            Err(BackendError::Rejected(reason)) if attempt < MAX_PUSH_ATTEMPTS => {
                warn!(attempt, %reason, "push rejected, integrating remote branch");
                fetch_and_integrate(repo, config)?;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Stage `changes` and commit them to the configured branch.
///
/// Returns `false` if the resulting tree equals the branch tip's.
fn commit(
    repo: &Repository,
    config: &GitBackendConfig,
    changes: &[Change],
    message: &str,
) -> Result<bool> {
    let mut index = repo.index()?;
    for change in changes {
        match change {
            Change::Write(key) => index.add_path(Path::new(key))?,
            Change::Remove(key) => index.remove_path(Path::new(key))?,
        }
    }
    index.write()?;
    let tree_id = index.write_tree()?;

    let branch_ref = config.branch_ref();
    let parent = repo
        .find_reference(&branch_ref)
        .ok()
        .and_then(|r| r.peel_to_commit().ok());
    if let Some(parent) = &parent {
        if parent.tree_id() == tree_id {
            debug!("tree unchanged, nothing to commit");
            return Ok(false);
        }
    }

    let tree = repo.find_tree(tree_id)?;
    let signature = Signature::now(&config.author_name, &config.author_email)?;
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
    let oid = repo.commit(
        Some(&branch_ref),
        &signature,
        &signature,
        message,
        &tree,
        &parents,
    )?;
    if repo.head().is_err() {
        repo.set_head(&branch_ref)?;
    }
    debug!(%oid, "committed");
    Ok(true)
}

/// Push the branch to its upstream, or set the upstream on first push.
fn push(repo: &Repository, config: &GitBackendConfig) -> Result<()> {
    let branch_ref = config.branch_ref();
    let upstream = repo
        .branch_upstream_merge(&branch_ref)
        .ok()
        .and_then(|buf| buf.as_str().map(str::to_string));

    match upstream {
        Some(destination) => push_refspec(repo, config, &format!("{branch_ref}:{destination}")),
        None => {
            info!(remote = %config.remote, branch = %config.branch, "first push, setting upstream");
            push_refspec(repo, config, &format!("{branch_ref}:{branch_ref}"))?;
            let mut branch = repo.find_branch(&config.branch, BranchType::Local)?;
            let upstream_name = format!("{}/{}", config.remote, config.branch);
            if let Err(e) = branch.set_upstream(Some(&upstream_name)) {
                warn!(error = %e, upstream = %upstream_name, "could not record upstream");
            }
            Ok(())
        }
    }
}

fn push_refspec(repo: &Repository, config: &GitBackendConfig, refspec: &str) -> Result<()> {
    let mut remote = repo.find_remote(&config.remote)?;
    let rejection: RefCell<Option<String>> = RefCell::new(None);
    {
        let mut callbacks = credential_callbacks();
        callbacks.push_update_reference(|refname, status| {
            if let Some(status) = status {
                *rejection.borrow_mut() = Some(format!("{refname}: {status}"));
            }
            Ok(())
        });
        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);
        if let Err(e) = remote.push(&[refspec], Some(&mut options)) {
            return Err(match e.code() {
                ErrorCode::NotFastForward => BackendError::Rejected(e.message().to_string()),
                _ => e.into(),
            });
        }
    }
    match rejection.into_inner() {
        Some(reason) => Err(BackendError::Rejected(reason)),
        None => {
            debug!(refspec, "pushed");
            Ok(())
        }
    }
}

/// Fetch the remote and bring the local branch on top of it.
///
/// A remote without the branch is not an error. A behind (or unborn) local
/// branch is fast-forwarded; a diverged one has its local-only changes
/// replayed onto the remote branch.
fn fetch_and_integrate(repo: &Repository, config: &GitBackendConfig) -> Result<()> {
    let mut remote = repo.find_remote(&config.remote)?;
    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(credential_callbacks());
    let refspec = format!("+refs/heads/*:refs/remotes/{}/*", config.remote);
    remote.fetch(&[refspec.as_str()], Some(&mut fetch), None)?;

    let Ok(remote_ref) = repo.find_reference(&config.tracking_ref()) else {
        debug!(branch = %config.branch, "remote branch does not exist yet");
        return Ok(());
    };
    let Some(target) = remote_ref.target() else {
        return Ok(());
    };
    let annotated = repo.reference_to_annotated_commit(&remote_ref)?;
    let (analysis, _) = repo.merge_analysis(&[&annotated])?;

    if analysis.is_up_to_date() {
        return Ok(());
    }
    if analysis.is_fast_forward() || analysis.is_unborn() {
        move_branch(repo, config, target, "vaultsync: fast-forward")?;
        debug!(%target, "fast-forwarded");
        return Ok(());
    }

    let local = repo.find_reference(&config.branch_ref())?.peel_to_commit()?;
    let upstream = repo.find_commit(target)?;
    let replayed = replay_onto(repo, config, &local, &upstream)?;
    move_branch(repo, config, replayed, "vaultsync: replay local changes")?;
    info!(branch = %config.branch, %replayed, "replayed local commits onto remote branch");
    Ok(())
}

/// Point the branch at `target` and check it out.
///
/// Called before any object of the current write is on disk, so the
/// working tree holds nothing uncommitted that a forced checkout could lose.
fn move_branch(repo: &Repository, config: &GitBackendConfig, target: Oid, log: &str) -> Result<()> {
    let branch_ref = config.branch_ref();
    repo.reference(&branch_ref, target, true, log)?;
    repo.set_head(&branch_ref)?;
    repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
    Ok(())
}

/// Commit the changes `local` made since it forked from `upstream` as one
/// commit on top of `upstream`. Without a common ancestor every file of
/// `local` counts as a change.
fn replay_onto(
    repo: &Repository,
    config: &GitBackendConfig,
    local: &Commit<'_>,
    upstream: &Commit<'_>,
) -> Result<Oid> {
    let base_tree = match repo.merge_base(local.id(), upstream.id()) {
        Ok(base) => Some(repo.find_commit(base)?.tree()?),
        Err(e) if e.code() == ErrorCode::NotFound => None,
        Err(e) => return Err(e.into()),
    };
    let local_tree = local.tree()?;
    let diff = repo.diff_tree_to_tree(base_tree.as_ref(), Some(&local_tree), None)?;

    let mut update = TreeUpdateBuilder::new();
    for delta in diff.deltas() {
        if delta.status() == Delta::Deleted {
            if let Some(path) = delta.old_file().path() {
                update.remove(path);
            }
        } else if let Some(path) = delta.new_file().path() {
            update.upsert(path, delta.new_file().id(), FileMode::Blob);
        }
    }

    let upstream_tree = upstream.tree()?;
    let tree_id = update.create_updated(repo, &upstream_tree)?;
    if tree_id == upstream_tree.id() {
        return Ok(upstream.id());
    }

    let tree = repo.find_tree(tree_id)?;
    let signature = Signature::now(&config.author_name, &config.author_email)?;
    let oid = repo.commit(
        None,
        &signature,
        &signature,
        "vaultsync: replay local changes",
        &tree,
        &[upstream],
    )?;
    Ok(oid)
}

/// Credentials: ssh agent, then git credential helpers, then defaults.
fn credential_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempts = 0u32;
    callbacks.credentials(move |url, username_from_url, allowed| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str("authentication failed"));
        }
        if allowed.contains(CredentialType::SSH_KEY) {
            return Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"));
        }
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            let config = git2::Config::open_default()?;
            return Cred::credential_helper(&config, url, username_from_url);
        }
        Cred::default()
    });
    callbacks
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vaultsync_crypto::{ChaChaCipher, Cipher, EncryptionKey};

    struct Fixture {
        dir: TempDir,
        cipher: ChaChaCipher,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            Repository::init_bare(dir.path().join("remote.git")).unwrap();
            Self {
                dir,
                cipher: ChaChaCipher::new(EncryptionKey::generate()),
            }
        }

        fn clone_named(&self, name: &str) -> GitBackend {
            let work = self.dir.path().join(name);
            let repo = Repository::init(&work).unwrap();
            let remote = self.dir.path().join("remote.git");
            repo.remote("origin", remote.to_str().unwrap()).unwrap();
            GitBackend::open(GitBackendConfig::new(&work)).unwrap()
        }

        fn sealed(&self, body: &str) -> Vec<u8> {
            self.cipher.encrypt(body.as_bytes()).unwrap()
        }

        fn item(&self, id: &str) -> PushItem {
            PushItem {
                id: id.to_string(),
                ciphertext: self.sealed(id),
                metadata: TypeMetadata::default(),
            }
        }

        fn commit_count(&self, name: &str) -> usize {
            let repo = Repository::open(self.dir.path().join(name)).unwrap();
            let mut walk = repo.revwalk().unwrap();
            walk.push_head().unwrap();
            walk.count()
        }
    }

    #[test]
    fn test_open_rejects_plain_directory() {
        let dir = TempDir::new().unwrap();
        let err = GitBackend::open(GitBackendConfig::new(dir.path())).err().unwrap();
        assert!(matches!(err, BackendError::NotConfigured(_)));
    }

    #[test]
    fn test_open_requires_remote() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let err = GitBackend::open(GitBackendConfig::new(dir.path())).err().unwrap();
        assert!(matches!(err, BackendError::NotConfigured(_)));
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config: GitBackendConfig =
            serde_json::from_str(r#"{"repo_dir":"/tmp/vault"}"#).unwrap();
        assert_eq!(config, GitBackendConfig::new("/tmp/vault"));
    }

    #[tokio::test]
    async fn test_push_many_is_one_commit() {
        let fx = Fixture::new();
        let backend = fx.clone_named("a");

        let items = vec![fx.item("web/1"), fx.item("web/2"), fx.item("api/1")];
        let result = backend
            .push_many(ResourceType::Sessions, items, None)
            .await
            .unwrap();

        assert_eq!(result.pushed_count(), 3);
        assert_eq!(result.failed_count(), 0);
        assert_eq!(fx.commit_count("a"), 1);

        let remote = Repository::open_bare(fx.dir.path().join("remote.git")).unwrap();
        assert!(remote.find_reference("refs/heads/main").is_ok());
    }

    #[tokio::test]
    async fn test_plaintext_never_committed() {
        let fx = Fixture::new();
        let backend = fx.clone_named("a");

        let items = vec![
            fx.item("good"),
            PushItem {
                id: "bad".into(),
                ciphertext: b"# plaintext agent".to_vec(),
                metadata: TypeMetadata::default(),
            },
        ];
        let result = backend.push_many(ResourceType::Agents, items, None).await.unwrap();

        assert_eq!(result.pushed, vec!["good"]);
        assert_eq!(result.failed[0].id, "bad");
        assert!(!fx.dir.path().join("a").join("agents/bad.enc").exists());
    }

    #[tokio::test]
    async fn test_second_clone_sees_pushed_objects() {
        let fx = Fixture::new();
        let first = fx.clone_named("a");
        let meta = TypeMetadata::project("web");
        first
            .push_one(ResourceType::Sessions, "web/1", &fx.sealed("one"), &meta)
            .await
            .unwrap();

        let second = fx.clone_named("b");
        let listed = second.list_all(ResourceType::Sessions).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "web/1");

        let bytes = second.pull_one(ResourceType::Sessions, "web/1").await.unwrap();
        assert_eq!(fx.cipher.decrypt(&bytes).unwrap(), b"one");

        // And back the other way, through the first-push path of the second clone.
        second
            .push_one(ResourceType::Sessions, "web/2", &fx.sealed("two"), &meta)
            .await
            .unwrap();
        let ids: Vec<String> = first
            .list_all(ResourceType::Sessions)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["web/1", "web/2"]);
    }

    async fn ids(backend: &GitBackend, resource_type: ResourceType) -> Vec<String> {
        backend
            .list_all(resource_type)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect()
    }

    async fn push_agent(fx: &Fixture, backend: &GitBackend, id: &str) -> Result<()> {
        backend
            .push_one(ResourceType::Agents, id, &fx.sealed(id), &TypeMetadata::default())
            .await
    }

    #[tokio::test]
    async fn test_machines_take_turns_pushing() {
        let fx = Fixture::new();
        let a = fx.clone_named("a");
        let b = fx.clone_named("b");

        push_agent(&fx, &a, "first").await.unwrap();
        assert_eq!(ids(&b, ResourceType::Agents).await, vec!["first"]);

        // b is now behind again; its write must land on top of a's.
        push_agent(&fx, &a, "from-a").await.unwrap();
        push_agent(&fx, &b, "from-b").await.unwrap();
        assert_eq!(
            ids(&b, ResourceType::Agents).await,
            vec!["first", "from-a", "from-b"]
        );

        push_agent(&fx, &b, "again").await.unwrap();
        assert_eq!(
            ids(&a, ResourceType::Agents).await,
            vec!["again", "first", "from-a", "from-b"]
        );
    }

    #[tokio::test]
    async fn test_unpushed_local_commit_is_replayed() {
        let fx = Fixture::new();
        let a = fx.clone_named("a");
        let b = fx.clone_named("b");
        push_agent(&fx, &a, "first").await.unwrap();
        ids(&b, ResourceType::Agents).await;

        // A commit b made but never got onto the remote.
        std::fs::write(fx.dir.path().join("b/agents/stranded.enc"), fx.sealed("stranded")).unwrap();
        b.blocking(|repo, config| {
            commit(
                repo,
                config,
                &[Change::Write("agents/stranded.enc".into())],
                "vaultsync: push agents stranded",
            )
        })
        .await
        .unwrap();

        push_agent(&fx, &a, "second").await.unwrap();
        push_agent(&fx, &b, "third").await.unwrap();

        assert_eq!(
            ids(&a, ResourceType::Agents).await,
            vec!["first", "second", "stranded", "third"]
        );
        let bytes = a.pull_one(ResourceType::Agents, "stranded").await.unwrap();
        assert_eq!(fx.cipher.decrypt(&bytes).unwrap(), b"stranded");
    }

    #[tokio::test]
    async fn test_listed_sessions_carry_project() {
        let fx = Fixture::new();
        let backend = fx.clone_named("a");
        let items = vec![fx.item("web/1"), fx.item("api/2")];
        backend
            .push_many(ResourceType::Sessions, items, None)
            .await
            .unwrap();

        let listed = backend.list_all(ResourceType::Sessions).await.unwrap();
        let projects: Vec<Option<String>> = listed
            .iter()
            .map(|d| d.metadata.as_ref().and_then(|m| m.project.clone()))
            .collect();
        assert_eq!(projects, vec![Some("api".to_string()), Some("web".to_string())]);
    }

    #[tokio::test]
    async fn test_delete_one() {
        let fx = Fixture::new();
        let backend = fx.clone_named("a");
        backend
            .push_one(ResourceType::Agents, "reviewer", &fx.sealed("x"), &TypeMetadata::default())
            .await
            .unwrap();

        backend.delete_one(ResourceType::Agents, "reviewer").await.unwrap();

        assert!(backend.list_all(ResourceType::Agents).await.unwrap().is_empty());
        assert!(backend
            .pull_one(ResourceType::Agents, "reviewer")
            .await
            .unwrap_err()
            .is_not_found());
        assert!(backend
            .delete_one(ResourceType::Agents, "reviewer")
            .await
            .unwrap_err()
            .is_not_found());
        assert_eq!(fx.commit_count("a"), 2);
    }

    #[tokio::test]
    async fn test_list_empty_remote() {
        let fx = Fixture::new();
        let backend = fx.clone_named("a");
        assert!(backend.list_all(ResourceType::Settings).await.unwrap().is_empty());
    }
}
