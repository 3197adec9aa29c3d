//! engine::model
//!
//! The observable repository model.
//!
//! # Architecture
//!
//! [`RepositoryModel`] is a cheaply cloneable handle around shared state. It
//! owns one [`Repository`] and publishes what a panel displays as an
//! immutable [`RepositorySnapshot`] on a watch channel. Every verb goes
//! through [`RepositoryModel::run`]:
//!
//! ```text
//! disposed? ──yes──▶ EngineError::Disposed (no process is spawned)
//!     │no
//! ledger start ─▶ retry(verb) ─▶ refresh unless read-only ─▶ ledger end
//! ```
//!
//! There is no write lock. Operations may overlap; git's lock files plus the
//! retry policy keep them safe, and refreshes that overlap collapse so a
//! burst of completions costs one or two status reads.
//!
//! # Invariants
//!
//! - Disposed is terminal; a disposed model never spawns git again
//! - Snapshots are replaced wholesale, never mutated in place
//! - A refresh that started after a caller's request satisfies that request
//!
//! # Example
//!
//! ```ignore
//! use gitdeck::core::config::EngineConfig;
//! use gitdeck::engine::{Collaborators, RepositoryModel};
//! use std::path::Path;
//!
//! let model = RepositoryModel::open(Path::new("."), Collaborators::system(), EngineConfig::default()).await?;
//! model.stage(&["src/lib.rs".into()]).await?;
//! println!("{} staged", model.snapshot().groups.index.len());
//! ```

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, info, instrument, warn};

use super::ledger::{OperationEvent, OperationLedger};
use super::operation::{Operation, OperationKind};
use super::resource::{ResourceGroups, Status};
use super::retry::{retry, RetryPolicy};
use super::{EngineError, EngineResult};
use crate::core::config::{EngineConfig, UntrackedPolicy};
use crate::core::types::{Branch, Commit, Remote, Stash, Submodule, Worktree};
use crate::git::repository::{
    CheckoutOptions, CommitOptions, FetchOptions, LogOptions, PullOptions, PushOptions, RefQuery,
};
use crate::git::{
    FileSystem, GitError, GitErrorKind, GitResult, GitRunner, ProcessSpawner, Repository,
    StatusOptions, TokioFileSystem, TokioSpawner,
};

/// Process and file access handed to the model.
#[derive(Clone)]
pub struct Collaborators {
    pub spawner: Arc<dyn ProcessSpawner>,
    pub fs: Arc<dyn FileSystem>,
}

impl Collaborators {
    /// Real processes and the real filesystem.
    pub fn system() -> Self {
        Self {
            spawner: Arc::new(TokioSpawner),
            fs: Arc::new(TokioFileSystem),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Lifecycle of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryState {
    Idle,
    /// The working tree is gone. Terminal.
    Disposed,
}

/// Everything a panel renders, as of one refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepositorySnapshot {
    pub head: Option<Branch>,
    pub remotes: Vec<Remote>,
    pub submodules: Vec<Submodule>,
    pub merge_in_progress: bool,
    pub rebase_in_progress: bool,
    pub groups: ResourceGroups,
    /// Status output was cut off at the configured limit.
    pub is_huge: bool,
}

struct ModelInner {
    repository: Arc<Repository>,
    config: EngineConfig,
    retry: RetryPolicy,
    ledger: OperationLedger,
    superproject: Option<PathBuf>,
    state: watch::Sender<RepositoryState>,
    snapshot: watch::Sender<Arc<RepositorySnapshot>>,
    refresh_requested: AtomicU64,
    /// Highest request number a finished refresh has satisfied.
    refresh_completed: Mutex<u64>,
    file_change_generation: AtomicU64,
}

/// Shared handle to one repository. Clones observe the same state.
#[derive(Clone)]
pub struct RepositoryModel {
    inner: Arc<ModelInner>,
}

impl std::fmt::Debug for RepositoryModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryModel")
            .field("root", &self.root())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl RepositoryModel {
    /// Open the repository containing `path` and load the first snapshot.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn open(
        path: &Path,
        collaborators: Collaborators,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        config.validate()?;
        let runner = Arc::new(GitRunner::detect(collaborators.spawner, &config).await);
        let repository =
            Repository::open(Arc::clone(&runner), collaborators.fs, path, &config).await?;
        let superproject = runner.superproject(repository.root()).await;

        let model = Self::new(repository, config, superproject);
        model.refresh().await?;
        info!(
            root = %model.root().display(),
            version = %runner.version(),
            "repository opened"
        );
        Ok(model)
    }

    /// Wrap an already resolved repository. No refresh is performed.
    pub fn new(repository: Repository, config: EngineConfig, superproject: Option<PathBuf>) -> Self {
        let (state, _) = watch::channel(RepositoryState::Idle);
        let (snapshot, _) = watch::channel(Arc::new(RepositorySnapshot::default()));
        Self {
            inner: Arc::new(ModelInner {
                repository: Arc::new(repository),
                retry: RetryPolicy::from(&config.refresh),
                config,
                ledger: OperationLedger::new(),
                superproject,
                state,
                snapshot,
                refresh_requested: AtomicU64::new(0),
                refresh_completed: Mutex::new(0),
                file_change_generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn root(&self) -> &Path {
        self.inner.repository.root()
    }

    pub fn repository(&self) -> &Repository {
        &self.inner.repository
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Working tree of the enclosing repository when this is a submodule.
    pub fn superproject(&self) -> Option<&Path> {
        self.inner.superproject.as_deref()
    }

    // ========================================================================
    // Observers
    // ========================================================================

    /// The latest snapshot.
    pub fn snapshot(&self) -> Arc<RepositorySnapshot> {
        Arc::clone(&self.inner.snapshot.borrow())
    }

    /// Receiver notified with every new snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<RepositorySnapshot>> {
        self.inner.snapshot.subscribe()
    }

    pub fn state(&self) -> RepositoryState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<RepositoryState> {
        self.inner.state.subscribe()
    }

    pub fn is_disposed(&self) -> bool {
        self.state() == RepositoryState::Disposed
    }

    /// Operation start and finish events.
    pub fn operations(&self) -> broadcast::Receiver<OperationEvent> {
        self.inner.ledger.subscribe()
    }

    pub fn ledger(&self) -> &OperationLedger {
        &self.inner.ledger
    }

    pub fn is_huge(&self) -> bool {
        self.inner.snapshot.borrow().is_huge
    }

    /// Move to the terminal state and clear the snapshot.
    pub fn dispose(&self) {
        let changed = self.inner.state.send_if_modified(|state| {
            if *state == RepositoryState::Disposed {
                false
            } else {
                *state = RepositoryState::Disposed;
                true
            }
        });
        if changed {
            info!(root = %self.root().display(), "repository disposed");
            self.inner
                .snapshot
                .send_replace(Arc::new(RepositorySnapshot::default()));
        }
    }

    // ========================================================================
    // Running operations
    // ========================================================================

    /// Run one verb with ledger bookkeeping, retries and the follow-up
    /// refresh.
    ///
    /// `f` may be called more than once; it receives the repository each
    /// time.
    pub async fn run<T, F, Fut>(&self, kind: OperationKind, mut f: F) -> EngineResult<T>
    where
        F: FnMut(Arc<Repository>) -> Fut,
        Fut: Future<Output = GitResult<T>>,
    {
        let operation = Operation::of(kind);
        let policy = self.inner.retry;
        let repository = Arc::clone(&self.inner.repository);
        self.track(kind, retry(&policy, &operation, || f(Arc::clone(&repository))))
            .await
    }

    /// Ledger, dispose-on-vanish and refresh around `work`, which does its
    /// own retrying.
    async fn track<T>(
        &self,
        kind: OperationKind,
        work: impl Future<Output = GitResult<T>>,
    ) -> EngineResult<T> {
        if self.is_disposed() {
            return Err(EngineError::Disposed);
        }

        let operation = Operation::of(kind);
        let guard = self.inner.ledger.start(operation);
        let result = work.await;

        if let Err(err) = &result {
            if err.is(GitErrorKind::NotAGitRepository) {
                self.dispose();
            }
        }

        let refreshed = if operation.read_only || self.is_disposed() {
            Ok(())
        } else {
            self.refresh().await
        };
        guard.finish(result.as_ref().err());

        match (result, refreshed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), refreshed) => {
                if let Err(refresh_err) = refreshed {
                    warn!(operation = %kind, error = %refresh_err, "refresh after failed operation also failed");
                }
                Err(err.into())
            }
        }
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.is_disposed() {
            Err(EngineError::Disposed)
        } else {
            Ok(())
        }
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    /// Re-read HEAD, remotes, submodules, markers and status, then publish a
    /// new snapshot.
    ///
    /// Concurrent calls collapse: a caller whose request was already covered
    /// by a refresh that started later returns without reading again.
    pub async fn refresh(&self) -> EngineResult<()> {
        self.ensure_open()?;
        let ticket = self.inner.refresh_requested.fetch_add(1, Ordering::SeqCst) + 1;

        let mut completed = self.inner.refresh_completed.lock().await;
        if *completed >= ticket {
            debug!(ticket, "refresh already covered");
            return Ok(());
        }
        self.ensure_open()?;

        let covers = self.inner.refresh_requested.load(Ordering::SeqCst);
        let guard = self
            .inner
            .ledger
            .start(Operation::of(OperationKind::Refresh));

        match self.read_snapshot().await {
            Ok(snapshot) => {
                *completed = covers;
                guard.finish(None);
                if !self.is_disposed() {
                    self.inner.snapshot.send_replace(Arc::new(snapshot));
                }
                Ok(())
            }
            Err(err) => {
                guard.finish(Some(&err));
                if err.is(GitErrorKind::NotAGitRepository) {
                    self.dispose();
                }
                Err(err.into())
            }
        }
    }

    async fn read_snapshot(&self) -> GitResult<RepositorySnapshot> {
        let repo = &self.inner.repository;
        let config = &self.inner.config;
        let options = StatusOptions {
            limit: config.status_limit,
            untracked: config.untracked_changes != UntrackedPolicy::Hidden,
            ignored: config.show_ignored,
        };

        let (head, remotes, submodules, merge_in_progress, rebase_in_progress, status) = tokio::join!(
            self.read_head(),
            repo.get_remotes(),
            repo.get_submodules(),
            repo.is_merge_in_progress(),
            repo.is_rebase_in_progress(),
            repo.status(options),
        );

        let status = status?;
        let head = head?;
        let remotes = remotes.unwrap_or_else(|err| {
            warn!(error = %err, "failed to list remotes");
            Vec::new()
        });

        if status.truncated {
            warn!(
                limit = config.status_limit,
                "too many changes, status was cut off"
            );
        }

        let groups = ResourceGroups::from_entries(&status.entries, repo.root(), config.untracked_changes);
        debug!(
            head = head.as_ref().and_then(|h| h.name()).unwrap_or("(detached)"),
            changes = groups.len(),
            merge_in_progress,
            rebase_in_progress,
            "refreshed"
        );

        Ok(RepositorySnapshot {
            head,
            remotes,
            submodules,
            merge_in_progress,
            rebase_in_progress,
            groups,
            is_huge: status.truncated,
        })
    }

    /// HEAD with upstream details; the bare HEAD when details are missing.
    async fn read_head(&self) -> GitResult<Option<Branch>> {
        let repo = &self.inner.repository;
        let head = match repo.get_head().await {
            Ok(head) => head,
            Err(err) if err.is(GitErrorKind::NotAGitRepository) => return Err(err),
            Err(err) => {
                debug!(error = %err, "no HEAD");
                return Ok(None);
            }
        };
        let Some(name) = head.name.clone() else {
            return Ok(Some(Branch::from_ref(head)));
        };
        match repo.get_branch(&name).await {
            Ok(branch) => Ok(Some(branch)),
            Err(err) => {
                debug!(branch = name, error = %err, "branch details unavailable");
                Ok(Some(Branch::from_ref(head)))
            }
        }
    }

    // ========================================================================
    // File changes
    // ========================================================================

    /// Note a change under the working tree.
    ///
    /// Bursts are debounced; the refresh runs once the debounce window has
    /// passed without further changes and no mutating operation is running.
    /// Returns false when the change was ignored.
    pub fn on_file_change(&self, path: &Path) -> bool {
        if is_ignored_change(path) || self.is_disposed() {
            return false;
        }
        if self.is_huge() {
            debug!(path = %path.display(), "repository is huge, not watching changes");
            return false;
        }

        let generation = self.inner.file_change_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let debounce = Duration::from_millis(self.inner.config.refresh.file_change_debounce_ms);
        let model = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if model.inner.file_change_generation.load(Ordering::SeqCst) != generation {
                return;
            }
            model.inner.ledger.wait_idle().await;
            if let Err(err) = model.refresh().await {
                warn!(error = %err, "refresh after file change failed");
            }
        });
        true
    }

    // ========================================================================
    // Index and working tree
    // ========================================================================

    /// Stage `paths`, or everything when empty.
    pub async fn stage(&self, paths: &[PathBuf]) -> EngineResult<()> {
        let paths = paths.to_vec();
        self.run(OperationKind::Add, move |repo| {
            let paths = paths.clone();
            async move { repo.add(&paths, false).await }
        })
        .await
    }

    /// Stage `content` as the index version of `path`.
    pub async fn stage_content(&self, path: &Path, content: &str) -> EngineResult<()> {
        let path = path.to_path_buf();
        let content = content.to_string();
        self.run(OperationKind::Stage, move |repo| {
            let path = path.clone();
            let content = content.clone();
            async move { repo.stage(&path, &content).await }
        })
        .await
    }

    /// Unstage `paths`, or everything when empty.
    pub async fn unstage(&self, paths: &[PathBuf]) -> EngineResult<()> {
        let paths = paths.to_vec();
        self.run(OperationKind::RevertFiles, move |repo| {
            let paths = paths.clone();
            async move { repo.revert_files("HEAD", &paths).await }
        })
        .await
    }

    /// Discard working-tree changes in `paths`.
    ///
    /// Untracked and ignored files are deleted with `git clean`; tracked
    /// files are restored from the index.
    pub async fn clean(&self, paths: &[PathBuf]) -> EngineResult<()> {
        self.ensure_open()?;
        let snapshot = self.snapshot();
        let (to_clean, to_checkout): (Vec<PathBuf>, Vec<PathBuf>) =
            paths.iter().cloned().partition(|path| {
                snapshot.groups.iter().any(|r| {
                    r.path == *path && matches!(r.status, Status::Untracked | Status::Ignored)
                })
            });

        self.run(OperationKind::Clean, move |repo| {
            let to_clean = to_clean.clone();
            let to_checkout = to_checkout.clone();
            async move {
                repo.clean(&to_clean).await?;
                if !to_checkout.is_empty() {
                    repo.checkout("", &to_checkout, CheckoutOptions::default())
                        .await?;
                }
                Ok(())
            }
        })
        .await
    }

    pub async fn reset(&self, treeish: &str, hard: bool) -> EngineResult<()> {
        let treeish = treeish.to_string();
        self.run(OperationKind::Reset, move |repo| {
            let treeish = treeish.clone();
            async move { repo.reset(&treeish, hard).await }
        })
        .await
    }

    pub async fn apply(&self, patch: &Path, reverse: bool) -> EngineResult<()> {
        let patch = patch.to_path_buf();
        self.run(OperationKind::Apply, move |repo| {
            let patch = patch.clone();
            async move { repo.apply(&patch, reverse).await }
        })
        .await
    }

    pub async fn commit(&self, message: Option<&str>, opts: CommitOptions) -> EngineResult<()> {
        let message = message.map(str::to_string);
        self.run(OperationKind::Commit, move |repo| {
            let message = message.clone();
            let opts = opts.clone();
            async move { repo.commit(message.as_deref(), &opts).await }
        })
        .await
    }

    // ========================================================================
    // Branches and tags
    // ========================================================================

    pub async fn checkout(&self, treeish: &str, opts: CheckoutOptions) -> EngineResult<()> {
        let treeish = treeish.to_string();
        self.run(OperationKind::Checkout, move |repo| {
            let treeish = treeish.clone();
            async move { repo.checkout(&treeish, &[], opts).await }
        })
        .await
    }

    pub async fn branch(&self, name: &str, checkout: bool, base: Option<&str>) -> EngineResult<()> {
        let name = name.to_string();
        let base = base.map(str::to_string);
        self.run(OperationKind::Branch, move |repo| {
            let name = name.clone();
            let base = base.clone();
            async move { repo.branch(&name, checkout, base.as_deref()).await }
        })
        .await
    }

    pub async fn delete_branch(&self, name: &str, force: bool) -> EngineResult<()> {
        let name = name.to_string();
        self.run(OperationKind::DeleteBranch, move |repo| {
            let name = name.clone();
            async move { repo.delete_branch(&name, force).await }
        })
        .await
    }

    pub async fn rename_branch(&self, name: &str) -> EngineResult<()> {
        let name = name.to_string();
        self.run(OperationKind::RenameBranch, move |repo| {
            let name = name.clone();
            async move { repo.rename_branch(&name).await }
        })
        .await
    }

    pub async fn set_branch_upstream(&self, name: &str, upstream: &str) -> EngineResult<()> {
        let name = name.to_string();
        let upstream = upstream.to_string();
        self.run(OperationKind::SetBranchUpstream, move |repo| {
            let name = name.clone();
            let upstream = upstream.clone();
            async move { repo.set_branch_upstream(&name, &upstream).await }
        })
        .await
    }

    pub async fn get_branch(&self, name: &str) -> EngineResult<Branch> {
        let name = name.to_string();
        self.run(OperationKind::GetBranch, move |repo| {
            let name = name.clone();
            async move { repo.get_branch(&name).await }
        })
        .await
    }

    pub async fn get_refs(&self, query: RefQuery) -> EngineResult<Vec<Branch>> {
        self.run(OperationKind::GetRefs, move |repo| {
            let query = query.clone();
            async move { repo.get_refs(&query).await }
        })
        .await
    }

    pub async fn tag(&self, name: &str, message: Option<&str>, target: Option<&str>) -> EngineResult<()> {
        let name = name.to_string();
        let message = message.map(str::to_string);
        let target = target.map(str::to_string);
        self.run(OperationKind::Tag, move |repo| {
            let name = name.clone();
            let message = message.clone();
            let target = target.clone();
            async move { repo.tag(&name, message.as_deref(), target.as_deref()).await }
        })
        .await
    }

    pub async fn delete_tag(&self, name: &str) -> EngineResult<()> {
        let name = name.to_string();
        self.run(OperationKind::DeleteTag, move |repo| {
            let name = name.clone();
            async move { repo.delete_tag(&name).await }
        })
        .await
    }

    // ========================================================================
    // Remotes
    // ========================================================================

    pub async fn fetch(&self, opts: FetchOptions) -> EngineResult<()> {
        self.run(OperationKind::Fetch, move |repo| {
            let opts = opts.clone();
            async move { repo.fetch(&opts).await }
        })
        .await
    }

    pub async fn pull(&self, opts: PullOptions) -> EngineResult<()> {
        self.run(OperationKind::Pull, move |repo| {
            let opts = opts.clone();
            async move { repo.pull(&opts).await }
        })
        .await
    }

    pub async fn push(&self, opts: PushOptions) -> EngineResult<()> {
        self.run(OperationKind::Push, move |repo| {
            let opts = opts.clone();
            async move { repo.push(&opts).await }
        })
        .await
    }

    /// Pull the current branch from its upstream, then push it back.
    ///
    /// The push is skipped when the branch is known to be level with its
    /// upstream or the remote is read-only.
    pub async fn sync(&self, rebase: bool) -> EngineResult<()> {
        self.ensure_open()?;
        let snapshot = self.snapshot();
        let head = snapshot.head.as_ref();
        let (Some(name), Some(upstream)) = (
            head.and_then(|h| h.name()).map(str::to_string),
            head.and_then(|h| h.upstream.clone()),
        ) else {
            return Err(GitError::other("the current branch has no upstream branch")
                .with_kind(GitErrorKind::NoUpstreamBranch)
                .into());
        };
        let should_push = head.and_then(|h| h.ahead).map_or(true, |ahead| ahead > 0)
            && !snapshot
                .remotes
                .iter()
                .any(|r| r.name == upstream.remote && r.is_read_only);

        let pull = PullOptions {
            rebase,
            remote: Some(upstream.remote.clone()),
            branch: Some(upstream.name.clone()),
            ..Default::default()
        };
        let push = PushOptions {
            remote: Some(upstream.remote.clone()),
            name: Some(format!("{name}:{}", upstream.name)),
            ..Default::default()
        };

        // Each stage retries on its own so a locked push never repeats the pull.
        let policy = self.inner.retry;
        let operation = Operation::of(OperationKind::Sync);
        let repo = Arc::clone(&self.inner.repository);
        self.track(OperationKind::Sync, async move {
            retry(&policy, &operation, || repo.pull(&pull)).await?;
            if should_push {
                retry(&policy, &operation, || repo.push(&push)).await?;
            }
            Ok(())
        })
        .await
    }

    pub async fn add_remote(&self, name: &str, url: &str) -> EngineResult<()> {
        let name = name.to_string();
        let url = url.to_string();
        self.run(OperationKind::Remote, move |repo| {
            let name = name.clone();
            let url = url.clone();
            async move { repo.add_remote(&name, &url).await }
        })
        .await
    }

    pub async fn remove_remote(&self, name: &str) -> EngineResult<()> {
        let name = name.to_string();
        self.run(OperationKind::Remote, move |repo| {
            let name = name.clone();
            async move { repo.remove_remote(&name).await }
        })
        .await
    }

    pub async fn rename_remote(&self, name: &str, new_name: &str) -> EngineResult<()> {
        let name = name.to_string();
        let new_name = new_name.to_string();
        self.run(OperationKind::Remote, move |repo| {
            let name = name.clone();
            let new_name = new_name.clone();
            async move { repo.rename_remote(&name, &new_name).await }
        })
        .await
    }

    // ========================================================================
    // Merge, rebase, cherry-pick
    // ========================================================================

    pub async fn merge(&self, reference: &str) -> EngineResult<()> {
        let reference = reference.to_string();
        self.run(OperationKind::Merge, move |repo| {
            let reference = reference.clone();
            async move { repo.merge(&reference).await }
        })
        .await
    }

    pub async fn merge_abort(&self) -> EngineResult<()> {
        self.run(OperationKind::MergeAbort, |repo| async move { repo.merge_abort().await })
            .await
    }

    pub async fn rebase(&self, branch: &str) -> EngineResult<()> {
        let branch = branch.to_string();
        self.run(OperationKind::Rebase, move |repo| {
            let branch = branch.clone();
            async move { repo.rebase(&branch).await }
        })
        .await
    }

    pub async fn rebase_abort(&self) -> EngineResult<()> {
        self.run(OperationKind::RebaseAbort, |repo| async move { repo.rebase_abort().await })
            .await
    }

    pub async fn rebase_continue(&self) -> EngineResult<()> {
        self.run(OperationKind::RebaseContinue, |repo| async move {
            repo.rebase_continue().await
        })
        .await
    }

    pub async fn cherry_pick(&self, commit: &str) -> EngineResult<()> {
        let commit = commit.to_string();
        self.run(OperationKind::CherryPick, move |repo| {
            let commit = commit.clone();
            async move { repo.cherry_pick(&commit).await }
        })
        .await
    }

    // ========================================================================
    // Stash
    // ========================================================================

    pub async fn stash(
        &self,
        message: Option<&str>,
        include_untracked: bool,
        staged: bool,
    ) -> EngineResult<()> {
        let message = message.map(str::to_string);
        self.run(OperationKind::Stash, move |repo| {
            let message = message.clone();
            async move { repo.stash(message.as_deref(), include_untracked, staged).await }
        })
        .await
    }

    pub async fn pop_stash(&self, index: Option<usize>) -> EngineResult<()> {
        self.run(OperationKind::Stash, move |repo| async move {
            repo.pop_stash(index).await
        })
        .await
    }

    pub async fn apply_stash(&self, index: Option<usize>) -> EngineResult<()> {
        self.run(OperationKind::Stash, move |repo| async move {
            repo.apply_stash(index).await
        })
        .await
    }

    pub async fn drop_stash(&self, index: Option<usize>) -> EngineResult<()> {
        self.run(OperationKind::Stash, move |repo| async move {
            repo.drop_stash(index).await
        })
        .await
    }

    pub async fn get_stashes(&self) -> EngineResult<Vec<Stash>> {
        self.run(OperationKind::GetStashes, |repo| async move { repo.get_stashes().await })
            .await
    }

    // ========================================================================
    // History
    // ========================================================================

    pub async fn log(&self, opts: LogOptions) -> EngineResult<Vec<Commit>> {
        self.run(OperationKind::Log, move |repo| {
            let opts = opts.clone();
            async move { repo.log(&opts).await }
        })
        .await
    }

    pub async fn get_commit(&self, reference: &str) -> EngineResult<Commit> {
        let reference = reference.to_string();
        self.run(OperationKind::GetCommit, move |repo| {
            let reference = reference.clone();
            async move { repo.get_commit(&reference).await }
        })
        .await
    }

    pub async fn merge_base(&self, a: &str, b: &str) -> EngineResult<Option<String>> {
        let a = a.to_string();
        let b = b.to_string();
        self.run(OperationKind::MergeBase, move |repo| {
            let a = a.clone();
            let b = b.clone();
            async move { repo.merge_base(&a, &b).await }
        })
        .await
    }

    /// Contents of `path` at `reference`.
    pub async fn show(&self, reference: &str, path: &Path) -> EngineResult<Vec<u8>> {
        let reference = reference.to_string();
        let path = path.to_path_buf();
        self.run(OperationKind::Show, move |repo| {
            let reference = reference.clone();
            let path = path.clone();
            async move { repo.show(&reference, &path).await }
        })
        .await
    }

    pub async fn blame(&self, path: &Path) -> EngineResult<String> {
        let path = path.to_path_buf();
        self.run(OperationKind::Blame, move |repo| {
            let path = path.clone();
            async move { repo.blame(&path).await }
        })
        .await
    }

    // ========================================================================
    // Config, ignore rules, worktrees
    // ========================================================================

    pub async fn get_config(&self, key: &str) -> EngineResult<String> {
        let key = key.to_string();
        self.run(OperationKind::GetConfig, move |repo| {
            let key = key.clone();
            async move { Ok(repo.get_config(&key).await) }
        })
        .await
    }

    pub async fn set_config(&self, key: &str, value: &str) -> EngineResult<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.run(OperationKind::Config, move |repo| {
            let key = key.clone();
            let value = value.clone();
            async move { repo.set_config(&key, &value).await }
        })
        .await
    }

    pub async fn check_ignore(&self, paths: &[PathBuf]) -> EngineResult<Vec<String>> {
        let paths = paths.to_vec();
        self.run(OperationKind::CheckIgnore, move |repo| {
            let paths = paths.clone();
            async move { repo.check_ignore(&paths).await }
        })
        .await
    }

    pub async fn worktrees(&self) -> EngineResult<Vec<Worktree>> {
        self.run(OperationKind::Worktrees, |repo| async move { repo.worktrees().await })
            .await
    }

    pub async fn add_worktree(
        &self,
        path: &Path,
        branch: Option<&str>,
        commitish: Option<&str>,
    ) -> EngineResult<()> {
        let path = path.to_path_buf();
        let branch = branch.map(str::to_string);
        let commitish = commitish.map(str::to_string);
        self.run(OperationKind::Worktree, move |repo| {
            let path = path.clone();
            let branch = branch.clone();
            let commitish = commitish.clone();
            async move {
                repo.add_worktree(&path, branch.as_deref(), commitish.as_deref())
                    .await
            }
        })
        .await
    }

    pub async fn delete_worktree(&self, path: &Path, force: bool) -> EngineResult<()> {
        let path = path.to_path_buf();
        self.run(OperationKind::DeleteWorktree, move |repo| {
            let path = path.clone();
            async move { repo.delete_worktree(&path, force).await }
        })
        .await
    }
}

/// Changes git makes while working, which say nothing new about the tree.
fn is_ignored_change(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    if name.starts_with(".watchman-cookie-") || name == ".git" {
        return true;
    }
    name == "index.lock"
        && path
            .parent()
            .and_then(Path::file_name)
            .is_some_and(|parent| parent == ".git")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Ref, UpstreamRef};
    use crate::git::mock::{MemoryFileSystem, MockResponse, MockSpawner};
    use crate::git::repository::test_support::repo_with;
    use crate::engine::resource::ResourceGroupKind;

    const HEAD_FILE: &str = "/repo/.git/HEAD";

    fn model_with(spawner: &MockSpawner, fs: &MemoryFileSystem, config: EngineConfig) -> RepositoryModel {
        RepositoryModel::new(repo_with(spawner, fs, "2.40.0"), config, None)
    }

    fn model(spawner: &MockSpawner) -> RepositoryModel {
        let fs = MemoryFileSystem::new();
        fs.write(HEAD_FILE, "ref: refs/heads/main\n");
        model_with(spawner, &fs, EngineConfig::default())
    }

    fn status_calls(spawner: &MockSpawner) -> usize {
        spawner.calls_matching(&["status", "-z"]).len()
    }

    mod open {
        use super::*;

        #[tokio::test]
        async fn resolves_root_and_loads_snapshot() {
            let spawner = MockSpawner::new();
            spawner.on(&["rev-parse", "--show-toplevel"], MockResponse::ok("/repo\n"));
            spawner.on(&["rev-parse", "--git-dir"], MockResponse::ok(".git\n.git\n"));
            spawner.on(&["status", "-z"], MockResponse::ok(" M a.txt\0"));
            let fs = MemoryFileSystem::new();
            fs.write(HEAD_FILE, "ref: refs/heads/main\n");

            let collaborators = Collaborators {
                spawner: Arc::new(spawner.clone()),
                fs: Arc::new(fs.clone()),
            };
            let model = RepositoryModel::open(Path::new("/repo/src"), collaborators, EngineConfig::default())
                .await
                .unwrap();

            assert_eq!(model.root(), Path::new("/repo"));
            let snapshot = model.snapshot();
            assert_eq!(snapshot.head.as_ref().and_then(|h| h.name()), Some("main"));
            assert_eq!(snapshot.groups.working_tree.len(), 1);
            assert_eq!(
                snapshot.groups.working_tree[0].path,
                PathBuf::from("/repo/a.txt")
            );
        }

        #[tokio::test]
        async fn outside_a_repository() {
            let spawner = MockSpawner::new();
            spawner.on(
                &["rev-parse", "--show-toplevel"],
                MockResponse::fail("fatal: not a git repository (or any of the parent directories): .git")
                    .with_exit_code(128),
            );
            let collaborators = Collaborators {
                spawner: Arc::new(spawner.clone()),
                fs: Arc::new(MemoryFileSystem::new()),
            };
            let err = RepositoryModel::open(Path::new("/tmp"), collaborators, EngineConfig::default())
                .await
                .unwrap_err();
            match err {
                EngineError::Git(err) => assert!(err.is(GitErrorKind::NotAGitRepository)),
                other => panic!("unexpected error {other:?}"),
            }
        }

        #[tokio::test]
        async fn invalid_config_is_rejected_before_git_runs() {
            let spawner = MockSpawner::new();
            let collaborators = Collaborators {
                spawner: Arc::new(spawner.clone()),
                fs: Arc::new(MemoryFileSystem::new()),
            };
            let config = EngineConfig {
                status_limit: 0,
                ..Default::default()
            };
            let err = RepositoryModel::open(Path::new("/repo"), collaborators, config)
                .await
                .unwrap_err();
            assert!(matches!(err, EngineError::Config(_)));
            assert_eq!(spawner.call_count(), 0);
        }
    }

    mod refresh {
        use super::*;

        #[tokio::test]
        async fn builds_buckets_and_head_details() {
            let spawner = MockSpawner::new();
            spawner.on(
                &["status", "-z"],
                MockResponse::ok("M  staged.rs\0?? new.txt\0UU conflict.rs\0"),
            );
            spawner.on(
                &["for-each-ref"],
                MockResponse::ok(format!(
                    "refs/heads/main\0origin/main\0{}\0[ahead 2]\0origin\0refs/heads/main\n",
                    "a".repeat(40)
                )),
            );
            let fs = MemoryFileSystem::new();
            fs.write(HEAD_FILE, "ref: refs/heads/main\n");
            fs.write("/repo/.git/MERGE_HEAD", "abc\n");
            let config = EngineConfig {
                untracked_changes: UntrackedPolicy::Separate,
                ..Default::default()
            };
            let model = model_with(&spawner, &fs, config);

            model.refresh().await.unwrap();
            let snapshot = model.snapshot();

            let head = snapshot.head.as_ref().unwrap();
            assert_eq!(head.ahead, Some(2));
            assert_eq!(
                head.upstream,
                Some(UpstreamRef {
                    remote: "origin".into(),
                    name: "main".into()
                })
            );
            assert!(snapshot.merge_in_progress);
            assert!(!snapshot.rebase_in_progress);
            assert_eq!(snapshot.groups.index.len(), 1);
            assert_eq!(snapshot.groups.untracked.len(), 1);
            assert_eq!(snapshot.groups.merge.len(), 1);
            assert_eq!(
                snapshot.groups.group(ResourceGroupKind::Index)[0].status,
                Status::IndexModified
            );
        }

        #[tokio::test]
        async fn hidden_untracked_uses_uno() {
            let spawner = MockSpawner::new();
            let fs = MemoryFileSystem::new();
            fs.write(HEAD_FILE, "ref: refs/heads/main\n");
            let config = EngineConfig {
                untracked_changes: UntrackedPolicy::Hidden,
                ..Default::default()
            };
            model_with(&spawner, &fs, config).refresh().await.unwrap();
            assert_eq!(spawner.calls_matching(&["status", "-z", "-uno"]).len(), 1);
        }

        #[tokio::test]
        async fn missing_branch_details_fall_back_to_head() {
            let spawner = MockSpawner::new();
            spawner.on(&["for-each-ref"], MockResponse::fail("fatal: bad"));
            spawner.on(&["rev-parse"], MockResponse::fail("fatal: ambiguous argument 'main'"));
            let model = model(&spawner);
            model.refresh().await.unwrap();
            assert_eq!(
                model.snapshot().head.as_ref().map(|h| h.reference.clone()),
                Some(Ref::head("main", None))
            );
        }

        #[tokio::test]
        async fn truncated_status_marks_huge() {
            let spawner = MockSpawner::new();
            spawner.on(&["status", "-z"], MockResponse::ok(" M a\0 M b\0 M c\0"));
            let fs = MemoryFileSystem::new();
            fs.write(HEAD_FILE, "ref: refs/heads/main\n");
            let config = EngineConfig {
                status_limit: 2,
                ..Default::default()
            };
            let model = model_with(&spawner, &fs, config);
            model.refresh().await.unwrap();
            assert!(model.is_huge());
            assert_eq!(model.snapshot().groups.len(), 2);
        }

        #[tokio::test]
        async fn publishes_to_subscribers() {
            let spawner = MockSpawner::new();
            spawner.on(&["status", "-z"], MockResponse::ok("A  x\0"));
            let model = model(&spawner);
            let mut rx = model.subscribe();
            model.refresh().await.unwrap();
            assert!(rx.has_changed().unwrap());
            assert_eq!(rx.borrow_and_update().groups.index.len(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn overlapping_refreshes_collapse() {
            let spawner = MockSpawner::new();
            spawner.on(
                &["status", "-z"],
                MockResponse::ok("").with_delay(Duration::from_millis(100)),
            );
            let model = model(&spawner);

            let (a, b, c) = tokio::join!(model.refresh(), model.refresh(), model.refresh());
            a.unwrap();
            b.unwrap();
            c.unwrap();

            assert_eq!(status_calls(&spawner), 2);
        }

        #[tokio::test]
        async fn not_a_repository_disposes() {
            let spawner = MockSpawner::new();
            spawner.on(
                &["status", "-z"],
                MockResponse::fail("fatal: not a git repository (or any of the parent directories): .git")
                    .with_exit_code(128),
            );
            let model = model(&spawner);
            let err = model.refresh().await.unwrap_err();
            assert!(matches!(err, EngineError::Git(_)));
            assert_eq!(model.state(), RepositoryState::Disposed);
            assert_eq!(*model.snapshot(), RepositorySnapshot::default());
        }
    }

    mod run {
        use super::*;

        #[tokio::test]
        async fn disposed_model_spawns_nothing() {
            let spawner = MockSpawner::new();
            let model = model(&spawner);
            model.dispose();

            assert!(matches!(model.stage(&[]).await, Err(EngineError::Disposed)));
            assert!(matches!(
                model.commit(Some("m"), CommitOptions::default()).await,
                Err(EngineError::Disposed)
            ));
            assert!(matches!(
                model.log(LogOptions::default()).await,
                Err(EngineError::Disposed)
            ));
            assert!(matches!(model.sync(false).await, Err(EngineError::Disposed)));
            assert!(matches!(model.clean(&[]).await, Err(EngineError::Disposed)));
            assert!(matches!(model.refresh().await, Err(EngineError::Disposed)));
            assert!(!model.on_file_change(Path::new("/repo/a.txt")));
            assert_eq!(spawner.call_count(), 0);
        }

        #[tokio::test]
        async fn mutation_is_followed_by_refresh() {
            let spawner = MockSpawner::new();
            let model = model(&spawner);
            model.stage(&[PathBuf::from("/repo/a.txt")]).await.unwrap();

            let calls = spawner.calls();
            assert!(calls[0].matches(&["add", "-A", "--", "a.txt"]));
            assert_eq!(status_calls(&spawner), 1);
        }

        #[tokio::test]
        async fn read_only_skips_refresh() {
            let spawner = MockSpawner::new();
            let model = model(&spawner);
            model.log(LogOptions::default()).await.unwrap();
            assert_eq!(status_calls(&spawner), 0);
        }

        #[tokio::test]
        async fn failure_still_refreshes() {
            let spawner = MockSpawner::new();
            spawner.on(
                &["merge"],
                MockResponse::fail("").with_stdout("CONFLICT (content): Merge conflict in a\n"),
            );
            let model = model(&spawner);
            let err = model.merge("topic").await.unwrap_err();
            match err {
                EngineError::Git(err) => assert!(err.is(GitErrorKind::Conflict)),
                other => panic!("unexpected error {other:?}"),
            }
            assert_eq!(status_calls(&spawner), 1);
        }

        #[tokio::test]
        async fn not_a_repository_during_operation_disposes() {
            let spawner = MockSpawner::new();
            spawner.on(
                &["add"],
                MockResponse::fail("fatal: not a git repository (or any of the parent directories): .git")
                    .with_exit_code(128),
            );
            let model = model(&spawner);
            assert!(model.stage(&[]).await.is_err());
            assert!(model.is_disposed());
            assert_eq!(status_calls(&spawner), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn lock_contention_is_retried() {
            let spawner = MockSpawner::new();
            spawner.on(
                &["commit"],
                MockResponse::fail("fatal: Unable to create '/repo/.git/index.lock': File exists."),
            );
            spawner.on(&["commit"], MockResponse::ok(""));
            let model = model(&spawner);
            model.commit(Some("msg"), CommitOptions::default()).await.unwrap();
            assert_eq!(spawner.calls_matching(&["commit"]).len(), 2);
            assert_eq!(status_calls(&spawner), 1);
        }

        #[tokio::test]
        async fn ledger_reports_operations() {
            let spawner = MockSpawner::new();
            let model = model(&spawner);
            let mut rx = model.operations();
            model.fetch(FetchOptions::default()).await.unwrap();

            let mut kinds = Vec::new();
            while let Ok(event) = rx.try_recv() {
                kinds.push(event.operation().kind);
            }
            assert_eq!(kinds.first(), Some(&OperationKind::Fetch));
            assert!(kinds.contains(&OperationKind::Refresh));
            assert!(model.ledger().is_idle());
        }

        #[tokio::test(start_paused = true)]
        async fn concurrent_mutations_end_with_final_state() {
            let spawner = MockSpawner::new();
            spawner.on(
                &["add"],
                MockResponse::ok("").with_delay(Duration::from_millis(20)),
            );
            spawner.on(
                &["stash", "push"],
                MockResponse::ok("").with_delay(Duration::from_millis(30)),
            );
            spawner.on(
                &["status", "-z"],
                MockResponse::ok("").with_delay(Duration::from_millis(50)),
            );
            let model = model(&spawner);

            let final_status = async {
                tokio::time::sleep(Duration::from_millis(25)).await;
                spawner.set(&["status", "-z"], MockResponse::ok("A  done.txt\0"));
            };
            let (a, b, ()) = tokio::join!(
                model.stage(&[]),
                model.stash(None, false, false),
                final_status
            );
            a.unwrap();
            b.unwrap();

            assert!(status_calls(&spawner) <= 2);
            assert_eq!(model.snapshot().groups.index.len(), 1);
        }
    }

    mod verbs {
        use super::*;

        #[tokio::test]
        async fn unstage_resets_against_head() {
            let spawner = MockSpawner::new();
            spawner.on(&["branch"], MockResponse::ok("* main"));
            let model = model(&spawner);
            model.unstage(&[PathBuf::from("/repo/a")]).await.unwrap();
            assert_eq!(spawner.calls_matching(&["reset", "-q", "HEAD", "--", "a"]).len(), 1);
        }

        #[tokio::test]
        async fn clean_splits_untracked_from_tracked() {
            let spawner = MockSpawner::new();
            spawner.on(&["status", "-z"], MockResponse::ok("?? new.txt\0 M old.txt\0"));
            let model = model(&spawner);
            model.refresh().await.unwrap();

            model
                .clean(&[PathBuf::from("/repo/new.txt"), PathBuf::from("/repo/old.txt")])
                .await
                .unwrap();

            assert_eq!(
                spawner
                    .calls_matching(&["clean", "-f", "-q", "--", "new.txt"])
                    .len(),
                1
            );
            assert_eq!(
                spawner
                    .calls_matching(&["checkout", "-q", "--", "old.txt"])
                    .len(),
                1
            );
        }

        #[tokio::test]
        async fn sync_pulls_then_pushes_upstream() {
            let spawner = MockSpawner::new();
            spawner.on(
                &["for-each-ref"],
                MockResponse::ok(format!(
                    "refs/heads/main\0origin/main\0{}\0[ahead 1, behind 2]\0origin\0refs/heads/main\n",
                    "b".repeat(40)
                )),
            );
            let model = model(&spawner);
            model.refresh().await.unwrap();
            model.sync(true).await.unwrap();

            assert_eq!(
                spawner
                    .calls_matching(&["pull", "--rebase", "origin", "main"])
                    .len(),
                1
            );
            assert_eq!(
                spawner.calls_matching(&["push", "origin", "main:main"]).len(),
                1
            );
        }

        #[tokio::test(start_paused = true)]
        async fn sync_retries_locked_push_without_repeating_pull() {
            let spawner = MockSpawner::new();
            spawner.on(
                &["for-each-ref"],
                MockResponse::ok(format!(
                    "refs/heads/main\0origin/main\0{}\0[ahead 1]\0origin\0refs/heads/main\n",
                    "b".repeat(40)
                )),
            );
            spawner.on(
                &["push"],
                MockResponse::fail("fatal: Unable to create '/repo/.git/index.lock': File exists."),
            );
            spawner.on(&["push"], MockResponse::ok(""));
            let model = model(&spawner);
            model.refresh().await.unwrap();
            model.sync(false).await.unwrap();

            assert_eq!(spawner.calls_matching(&["pull"]).len(), 1);
            assert_eq!(spawner.calls_matching(&["push"]).len(), 2);
        }

        #[tokio::test]
        async fn sync_skips_push_when_level() {
            let spawner = MockSpawner::new();
            spawner.on(
                &["for-each-ref"],
                MockResponse::ok(format!(
                    "refs/heads/main\0origin/main\0{}\0\0origin\0refs/heads/main\n",
                    "b".repeat(40)
                )),
            );
            let model = model(&spawner);
            model.refresh().await.unwrap();
            model.sync(false).await.unwrap();
            assert_eq!(spawner.calls_matching(&["pull"]).len(), 1);
            assert!(spawner.calls_matching(&["push"]).is_empty());
        }

        #[tokio::test]
        async fn sync_without_upstream() {
            let spawner = MockSpawner::new();
            let model = model(&spawner);
            let err = model.sync(false).await.unwrap_err();
            match err {
                EngineError::Git(err) => assert!(err.is(GitErrorKind::NoUpstreamBranch)),
                other => panic!("unexpected error {other:?}"),
            }
            assert!(spawner.calls_matching(&["pull"]).is_empty());
        }

        #[tokio::test]
        async fn get_config_is_read_only() {
            let spawner = MockSpawner::new();
            spawner.on(&["config", "--get", "user.name"], MockResponse::ok("Jane\n"));
            let model = model(&spawner);
            assert_eq!(model.get_config("user.name").await.unwrap(), "Jane");
            assert_eq!(status_calls(&spawner), 0);
        }
    }

    mod file_changes {
        use super::*;

        #[test]
        fn ignored_paths() {
            assert!(is_ignored_change(Path::new("/repo/.git/index.lock")));
            assert!(is_ignored_change(Path::new("/repo/.watchman-cookie-host-1")));
            assert!(is_ignored_change(Path::new("/repo/.git")));
            assert!(!is_ignored_change(Path::new("/repo/index.lock")));
            assert!(!is_ignored_change(Path::new("/repo/.git/HEAD")));
        }

        #[tokio::test(start_paused = true)]
        async fn bursts_are_debounced() {
            let spawner = MockSpawner::new();
            let model = model(&spawner);

            for i in 0..5 {
                assert!(model.on_file_change(&PathBuf::from(format!("/repo/f{i}"))));
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            assert_eq!(status_calls(&spawner), 0);

            tokio::time::sleep(Duration::from_millis(1500)).await;
            assert_eq!(status_calls(&spawner), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn lock_file_changes_do_nothing() {
            let spawner = MockSpawner::new();
            let model = model(&spawner);
            assert!(!model.on_file_change(Path::new("/repo/.git/index.lock")));
            tokio::time::sleep(Duration::from_millis(1500)).await;
            assert_eq!(spawner.call_count(), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn waits_for_running_operation() {
            let spawner = MockSpawner::new();
            let model = model(&spawner);
            let guard = model.ledger().start(Operation::of(OperationKind::Commit));

            model.on_file_change(Path::new("/repo/a.txt"));
            tokio::time::sleep(Duration::from_millis(1500)).await;
            assert_eq!(status_calls(&spawner), 0);

            guard.finish(None);
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(status_calls(&spawner), 1);
        }

        #[tokio::test]
        async fn huge_repository_is_not_watched() {
            let spawner = MockSpawner::new();
            spawner.on(&["status", "-z"], MockResponse::ok(" M a\0 M b\0"));
            let fs = MemoryFileSystem::new();
            fs.write(HEAD_FILE, "ref: refs/heads/main\n");
            let config = EngineConfig {
                status_limit: 1,
                ..Default::default()
            };
            let model = model_with(&spawner, &fs, config);
            model.refresh().await.unwrap();
            assert!(!model.on_file_change(Path::new("/repo/a")));
        }
    }
}
