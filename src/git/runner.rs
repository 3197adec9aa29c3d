//! git::runner
//!
//! Command builder and runner for the git executable.
//!
//! # Architecture
//!
//! [`GitRunner`] is the only component that hands argument vectors to the
//! [`ProcessSpawner`]. It:
//!
//! - knows the installed [`GitVersion`] and gates optional flags on it
//! - adds a fixed environment so stderr stays machine-matchable
//! - logs every invocation with its elapsed time
//! - turns non-zero exits into [`GitError`] classified by the global rules
//! - resolves repository root and `.git` locations
//!
//! # Error Handling
//!
//! Commands needed for control flow (root and `.git` discovery) propagate
//! errors. Best-effort lookups (superproject detection) degrade to `None`
//! plus a warning.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument, warn};

use super::classify::classify_global;
use super::error::{GitError, GitResult};
use super::process::{ExecOptions, ProcessSpawner, ProcessStream, RawOutput};
use crate::core::config::EngineConfig;
use crate::core::paths::DotGit;
use crate::core::version::GitVersion;

/// Trimmed output of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Builds and runs git invocations.
pub struct GitRunner {
    git_path: PathBuf,
    version: GitVersion,
    spawner: Arc<dyn ProcessSpawner>,
    log_watch: Vec<String>,
    env: HashMap<String, String>,
}

impl std::fmt::Debug for GitRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRunner")
            .field("git_path", &self.git_path)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl GitRunner {
    /// Create a runner for a known version.
    pub fn new(spawner: Arc<dyn ProcessSpawner>, version: GitVersion, config: &EngineConfig) -> Self {
        let env = HashMap::from([
            ("LC_ALL".to_string(), "en_US.UTF-8".to_string()),
            ("LANG".to_string(), "en_US.UTF-8".to_string()),
            ("GIT_TERMINAL_PROMPT".to_string(), "0".to_string()),
        ]);
        Self {
            git_path: config.git_path.clone(),
            version,
            spawner,
            log_watch: config.command_log_watch.clone(),
            env,
        }
    }

    /// Create a runner after asking the executable for its version.
    ///
    /// A failing or unparseable `--version` yields an unknown version, which
    /// disables every gated feature.
    pub async fn detect(spawner: Arc<dyn ProcessSpawner>, config: &EngineConfig) -> Self {
        let mut runner = Self::new(spawner, GitVersion::unknown(), config);
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        match runner.exec(&cwd, &["--version"], ExecOptions::default()).await {
            Ok(result) => runner.version = GitVersion::parse(&result.stdout),
            Err(err) => warn!(error = %err, "could not determine git version"),
        }
        if runner.version.version().is_none() {
            warn!(raw = runner.version.raw(), "unparseable git version");
        }
        runner
    }

    pub fn version(&self) -> &GitVersion {
        &self.version
    }

    pub fn git_path(&self) -> &Path {
        &self.git_path
    }

    fn merge_options(&self, mut options: ExecOptions) -> ExecOptions {
        for (k, v) in &self.env {
            options.env.entry(k.clone()).or_insert_with(|| v.clone());
        }
        options
    }

    fn watched(&self, args: &[String]) -> bool {
        subcommand(args).is_some_and(|sub| self.log_watch.iter().any(|w| w == sub))
    }

    /// Run to completion with untrimmed byte output.
    ///
    /// Non-zero exit is an error classified by the global rules.
    pub async fn exec_raw<S: AsRef<str>>(
        &self,
        cwd: &Path,
        args: &[S],
        options: ExecOptions,
    ) -> GitResult<RawOutput> {
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
        let log_output = options.log_output || self.watched(&args);
        let options = self.merge_options(options);

        let started = Instant::now();
        let output = self
            .spawner
            .execute(&self.git_path, cwd, &args, &options)
            .await
            .map_err(|e| GitError::spawn(&args, &e))?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        debug!(
            command = %args.join(" "),
            elapsed_ms,
            exit_code = ?output.exit_code,
            "git"
        );
        if log_output {
            debug!(stdout = %String::from_utf8_lossy(&output.stdout), "git output");
        }

        if output.exit_code == Some(0) {
            return Ok(output);
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let mut err = GitError::failed(&args, output.exit_code, stdout, stderr);
        err.kind = classify_global(&err.stdout, &err.stderr);
        debug!(
            command = %args.join(" "),
            kind = ?err.kind,
            stderr = %err.stderr.trim(),
            "git failed"
        );
        Err(err)
    }

    /// Run to completion and return trimmed text output.
    pub async fn exec<S: AsRef<str>>(
        &self,
        cwd: &Path,
        args: &[S],
        options: ExecOptions,
    ) -> GitResult<ExecResult> {
        let output = self.exec_raw(cwd, args, options).await?;
        Ok(ExecResult {
            exit_code: output.exit_code.unwrap_or_default(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    /// Start a streaming invocation.
    pub async fn stream<S: AsRef<str>>(
        &self,
        cwd: &Path,
        args: &[S],
        options: ExecOptions,
    ) -> GitResult<ProcessStream> {
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
        let options = self.merge_options(options);
        let command = args.join(" ");
        debug!(command = %command, "git (streaming)");
        let started = tokio::time::Instant::now();
        let stream = self
            .spawner
            .stream(&self.git_path, cwd, &args, &options)
            .await
            .map_err(|e| GitError::spawn(&args, &e))?;
        Ok(stream.timed(command, started))
    }

    // =========================================================================
    // Repository discovery
    // =========================================================================

    /// Top-level directory of the working tree containing `path`.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn repository_root(&self, path: &Path) -> GitResult<PathBuf> {
        let result = self
            .exec(path, &["rev-parse", "--show-toplevel"], ExecOptions::default())
            .await?;
        if result.stdout.is_empty() {
            return Err(GitError::other(format!(
                "rev-parse returned no toplevel for {}",
                path.display()
            )));
        }
        Ok(PathBuf::from(result.stdout))
    }

    /// `.git` locations for the working tree at `root`.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub async fn dot_git(&self, root: &Path) -> GitResult<DotGit> {
        let result = self
            .exec(root, &["rev-parse", "--git-dir", "--git-common-dir"], ExecOptions::default())
            .await?;
        let mut lines = result.stdout.lines();
        let git_dir = lines
            .next()
            .map(|l| absolutize(root, l.trim()))
            .ok_or_else(|| GitError::other("rev-parse returned no git dir"))?;
        let common_dir = lines
            .next()
            .map(|l| absolutize(root, l.trim()))
            .unwrap_or_else(|| git_dir.clone());
        Ok(DotGit::new(git_dir, common_dir))
    }

    /// Working tree of the superproject when `root` is a submodule.
    ///
    /// Best-effort: `None` on old git, on failure, or outside a submodule.
    pub async fn superproject(&self, root: &Path) -> Option<PathBuf> {
        if !self.version.supports_superproject() {
            return None;
        }
        match self
            .exec(root, &["rev-parse", "--show-superproject-working-tree"], ExecOptions::default())
            .await
        {
            Ok(result) if !result.stdout.is_empty() => Some(PathBuf::from(result.stdout)),
            Ok(_) => None,
            Err(err) => {
                warn!(error = %err, "superproject detection failed");
                None
            }
        }
    }

    /// `git init`, naming the initial branch when supported.
    pub async fn init(&self, path: &Path, default_branch: Option<&str>) -> GitResult<()> {
        let mut args = vec!["init".to_string()];
        if let Some(branch) = default_branch {
            if self.version.supports_initial_branch() {
                args.push("-b".into());
                args.push(branch.into());
            }
        }
        self.exec(path, &args, ExecOptions::default()).await?;
        Ok(())
    }
}

/// First non-option argument, skipping `-c key=value` pairs.
pub fn subcommand(args: &[String]) -> Option<&str> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "-c" || arg == "-C" {
            iter.next();
            continue;
        }
        if !arg.starts_with('-') {
            return Some(arg);
        }
    }
    None
}

fn absolutize(root: &Path, p: &str) -> PathBuf {
    let path = PathBuf::from(p);
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}

/// Split `items` into batches whose combined length stays within
/// `max_len`. An item longer than `max_len` forms its own batch.
pub fn split_in_chunks<S: AsRef<str>>(items: &[S], max_len: usize) -> Vec<Vec<String>> {
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_len = 0usize;

    for item in items {
        let item = item.as_ref();
        if !current.is_empty() && current_len + item.len() > max_len {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current_len += item.len();
        current.push(item.to_string());
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
