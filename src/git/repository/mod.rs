//! git::repository
//!
//! One working tree, one method per git verb.
//!
//! # Architecture
//!
//! [`Repository`] wraps a [`GitRunner`] bound to a working-tree root and the
//! [`FileSystem`] used for the handful of `.git` files read directly. Every
//! method builds an argument vector, runs it, maps the output through
//! [`crate::git::parse`] and, on failure, refines the error kind with the
//! verb's rule table from [`crate::git::classify`].
//!
//! Verbs are grouped by family in submodules:
//!
//! - `index`: staging, commit, reset, clean, apply
//! - `branches`: checkout, branches, tags, refs
//! - `remote`: fetch, pull, push, remotes
//! - `history`: log, show, merge, rebase, cherry-pick, blame
//! - `stash`: stash family
//! - `worktree`: linked worktrees
//!
//! Path-bearing verbs batch their paths with [`split_in_chunks`] so no single
//! command line exceeds the configured length.
//!
//! # Error Handling
//!
//! Failures that callers act on propagate as [`GitError`]. Best-effort reads
//! (`get_config`, HEAD fast path, `.gitmodules`) degrade to an empty or
//! fallback result plus a warning.

mod branches;
mod history;
mod index;
mod remote;
mod stash;
mod worktree;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::classify::classify_global;
use super::error::{GitError, GitResult};
use super::fs::FileSystem;
use super::parse::{
    parse_gitmodules, parse_remote_verbose, parse_remotes_from_config, RawStatusEntry,
    StatusParser,
};
use super::process::{ExecOptions, StreamEvent};
use super::runner::{split_in_chunks, ExecResult, GitRunner};
use crate::core::config::EngineConfig;
use crate::core::paths::DotGit;
use crate::core::types::{Ref, Remote, Submodule};

pub use branches::{CheckoutOptions, RefQuery, RefSort};
pub use history::LogOptions;
pub use index::CommitOptions;
pub use remote::{FetchOptions, PullOptions, PushOptions};

/// How `push` overrides the remote's ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForcePushMode {
    Force,
    ForceWithLease,
    ForceWithLeaseIfIncludes,
}

/// Result of a status read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusResult {
    pub entries: Vec<RawStatusEntry>,
    /// More entries existed than the limit allowed.
    pub truncated: bool,
}

/// Options for [`Repository::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusOptions {
    /// Entry count past which the stream is killed.
    pub limit: usize,
    pub untracked: bool,
    pub ignored: bool,
}

impl Default for StatusOptions {
    fn default() -> Self {
        Self {
            limit: 10_000,
            untracked: true,
            ignored: false,
        }
    }
}

static HEAD_BRANCH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ref: refs/heads/(\S+)$").expect("static HEAD pattern"));
static OBJECT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{40,64}$").expect("static object id pattern"));

/// Reftable repositories keep this placeholder in `HEAD`.
const REFTABLE_HEAD: &str = ".invalid";

/// What `.git/HEAD` says, when it can be trusted.
fn parse_head_file(raw: &str) -> Option<Ref> {
    let raw = raw.trim();
    if let Some(caps) = HEAD_BRANCH.captures(raw) {
        let name = &caps[1];
        if name == REFTABLE_HEAD {
            return None;
        }
        return Some(Ref::head(name, None));
    }
    if OBJECT_ID.is_match(raw) {
        return Some(Ref::detached(raw));
    }
    None
}

/// One git working tree.
pub struct Repository {
    runner: Arc<GitRunner>,
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    dot_git: DotGit,
    max_cli_length: usize,
    require_user_config: bool,
    /// Cleared once `.git/HEAD` proves unreadable as a plain file.
    head_fast_path: AtomicBool,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("root", &self.root)
            .field("dot_git", &self.dot_git)
            .finish_non_exhaustive()
    }
}

impl Repository {
    pub fn new(
        runner: Arc<GitRunner>,
        fs: Arc<dyn FileSystem>,
        root: PathBuf,
        dot_git: DotGit,
        config: &EngineConfig,
    ) -> Self {
        Self {
            runner,
            fs,
            root,
            dot_git,
            max_cli_length: config.max_cli_length,
            require_user_config: config.require_user_config,
            head_fast_path: AtomicBool::new(true),
        }
    }

    /// Resolve the working tree containing `path`.
    pub async fn open(
        runner: Arc<GitRunner>,
        fs: Arc<dyn FileSystem>,
        path: &Path,
        config: &EngineConfig,
    ) -> GitResult<Self> {
        let root = runner.repository_root(path).await?;
        let dot_git = runner.dot_git(&root).await?;
        Ok(Self::new(runner, fs, root, dot_git, config))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dot_git(&self) -> &DotGit {
        &self.dot_git
    }

    pub fn runner(&self) -> &GitRunner {
        &self.runner
    }

    async fn exec<S: AsRef<str>>(&self, args: &[S]) -> GitResult<ExecResult> {
        self.runner.exec(&self.root, args, ExecOptions::default()).await
    }

    async fn exec_with<S: AsRef<str>>(
        &self,
        args: &[S],
        options: ExecOptions,
    ) -> GitResult<ExecResult> {
        self.runner.exec(&self.root, args, options).await
    }

    /// Path argument relative to the root when possible.
    fn path_arg(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        let s = rel.to_string_lossy().into_owned();
        if s.is_empty() {
            ".".to_string()
        } else {
            s
        }
    }

    fn path_args(&self, paths: &[PathBuf]) -> Vec<String> {
        paths.iter().map(|p| self.path_arg(p)).collect()
    }

    /// Run `prefix -- <batch>` for each batch of `paths`.
    async fn exec_batched(&self, prefix: &[String], paths: &[String]) -> GitResult<()> {
        for chunk in split_in_chunks(paths, self.max_cli_length) {
            let mut args = prefix.to_vec();
            args.push("--".into());
            args.extend(chunk);
            self.exec(&args).await?;
        }
        Ok(())
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Stream `git status -z`, stopping once more than `limit` entries arrive.
    pub async fn status(&self, options: StatusOptions) -> GitResult<StatusResult> {
        let mut args: Vec<String> = vec!["status".into(), "-z".into()];
        args.push(if options.untracked { "-uall" } else { "-uno" }.into());
        if options.ignored {
            args.push("--ignored".into());
        }

        let mut stream = self
            .runner
            .stream(&self.root, &args, ExecOptions::default())
            .await?;
        let mut parser = StatusParser::new();
        let mut stderr = Vec::new();

        while let Some(event) = stream.next().await {
            match event {
                StreamEvent::Stdout(chunk) => {
                    parser.update(&chunk);
                    if parser.len() > options.limit {
                        stream.kill();
                        debug!(limit = options.limit, "status limit exceeded");
                        let mut entries = parser.into_entries();
                        entries.truncate(options.limit);
                        return Ok(StatusResult {
                            entries,
                            truncated: true,
                        });
                    }
                }
                StreamEvent::Stderr(chunk) => stderr.extend_from_slice(&chunk),
                StreamEvent::Exit(Some(0)) => break,
                StreamEvent::Exit(code) => {
                    let stderr = String::from_utf8_lossy(&stderr).into_owned();
                    let mut err = GitError::failed(&args, code, String::new(), stderr);
                    err.kind = classify_global(&err.stdout, &err.stderr);
                    return Err(err);
                }
            }
        }

        Ok(StatusResult {
            entries: parser.into_entries(),
            truncated: false,
        })
    }

    // =========================================================================
    // HEAD
    // =========================================================================

    /// The current HEAD.
    ///
    /// Reads `HEAD` directly when possible. Reftable placeholders and
    /// unrecognized content switch this instance to git for good.
    pub async fn get_head(&self) -> GitResult<Ref> {
        if self.head_fast_path.load(Ordering::Relaxed) {
            match self.fs.read_to_string(&self.dot_git.head_path()).await {
                Ok(raw) => match parse_head_file(&raw) {
                    Some(head) => return Ok(head),
                    None => {
                        warn!(content = raw.trim(), "HEAD file not usable, falling back to git");
                        self.head_fast_path.store(false, Ordering::Relaxed);
                    }
                },
                Err(err) => warn!(error = %err, "failed to read HEAD file"),
            }
        }

        match self.exec(&["symbolic-ref", "--short", "HEAD"]).await {
            Ok(result) if !result.stdout.is_empty() => return Ok(Ref::head(result.stdout, None)),
            Ok(_) => debug!("symbolic-ref returned nothing"),
            Err(err) => debug!(error = %err, "HEAD is not symbolic"),
        }

        let result = self.exec(&["rev-parse", "HEAD"]).await?;
        if result.stdout.is_empty() {
            return Err(GitError::other("error parsing HEAD"));
        }
        Ok(Ref::detached(result.stdout))
    }

    /// True while `.git/HEAD` is read directly.
    pub fn uses_head_file(&self) -> bool {
        self.head_fast_path.load(Ordering::Relaxed)
    }

    // =========================================================================
    // Remotes and submodules
    // =========================================================================

    /// Remotes from the shared config, or `remote --verbose` when the file
    /// cannot be read.
    pub async fn get_remotes(&self) -> GitResult<Vec<Remote>> {
        match self.fs.read_to_string(&self.dot_git.config_path()).await {
            Ok(raw) => return Ok(parse_remotes_from_config(&raw)),
            Err(err) => warn!(error = %err, "failed to read config, listing remotes with git"),
        }
        let result = self.exec(&["remote", "--verbose"]).await?;
        Ok(parse_remote_verbose(&result.stdout))
    }

    /// Submodules declared in `.gitmodules`; empty when there is none.
    pub async fn get_submodules(&self) -> Vec<Submodule> {
        let path = self.root.join(".gitmodules");
        if !self.fs.exists(&path).await {
            return Vec::new();
        }
        match self.fs.read_to_string(&path).await {
            Ok(raw) => parse_gitmodules(&raw),
            Err(err) => {
                warn!(error = %err, "failed to read .gitmodules");
                Vec::new()
            }
        }
    }

    // =========================================================================
    // Config
    // =========================================================================

    /// `git config --get key`; empty on failure.
    pub async fn get_config(&self, key: &str) -> String {
        match self.exec(&["config", "--get", key]).await {
            Ok(result) => result.stdout,
            Err(err) => {
                warn!(key, error = %err, "config read failed");
                String::new()
            }
        }
    }

    pub async fn set_config(&self, key: &str, value: &str) -> GitResult<()> {
        self.exec(&["config", "--local", key, value]).await?;
        Ok(())
    }

    /// `user.name` and `user.email`, when set.
    pub async fn get_user_config(&self) -> (Option<String>, Option<String>) {
        let name = self.get_config("user.name").await;
        let email = self.get_config("user.email").await;
        (
            (!name.is_empty()).then_some(name),
            (!email.is_empty()).then_some(email),
        )
    }

    /// Paths git would ignore, out of `paths`.
    pub async fn check_ignore(&self, paths: &[PathBuf]) -> GitResult<Vec<String>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let input = self.path_args(paths).join("\0");
        let args = ["check-ignore", "-z", "--stdin"];
        match self.exec_with(&args, ExecOptions::with_input(input)).await {
            Ok(result) => Ok(result
                .stdout
                .split('\0')
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()),
            // Exit 1: nothing ignored.
            Err(err) if err.exit_code == Some(1) => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    // =========================================================================
    // In-progress markers
    // =========================================================================

    pub async fn is_merge_in_progress(&self) -> bool {
        self.fs.exists(&self.dot_git.merge_head_path()).await
    }

    pub async fn is_rebase_in_progress(&self) -> bool {
        self.fs.exists(&self.dot_git.rebase_apply_path()).await
            || self.fs.exists(&self.dot_git.rebase_merge_path()).await
    }
}
