//! Staging, commit and working-tree resets.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::Repository;
use crate::git::classify::{refine, ADD_RULES, APPLY_RULES, COMMIT_RULES};
use crate::git::error::{GitError, GitErrorKind, GitResult};
use crate::git::process::ExecOptions;

/// Flags for [`Repository::commit`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitOptions {
    pub all: bool,
    pub amend: bool,
    pub signoff: bool,
    /// GPG-sign (`-S`).
    pub sign: bool,
    /// Allow a commit without changes.
    pub empty: bool,
    pub no_verify: bool,
    /// Include the diff in the editor buffer.
    pub verbose: bool,
    /// Leave the message to git's editor.
    pub use_editor: bool,
}

impl Repository {
    /// `git add -A -- <paths>`, or the whole tree when `paths` is empty.
    pub async fn add(&self, paths: &[PathBuf], update_only: bool) -> GitResult<()> {
        let prefix = vec![
            "add".to_string(),
            if update_only { "-u" } else { "-A" }.to_string(),
        ];
        let paths = if paths.is_empty() {
            vec![".".to_string()]
        } else {
            self.path_args(paths)
        };
        self.exec_batched(&prefix, &paths)
            .await
            .map_err(|e| refine(e, &ADD_RULES))
    }

    /// Stage `content` as the index version of `path` without touching the
    /// working tree.
    pub async fn stage(&self, path: &Path, content: &str) -> GitResult<()> {
        let rel = self.path_arg(path);
        let hash = self
            .exec_with(
                &["hash-object", "--stdin", "-w", "--path", rel.as_str()],
                ExecOptions::with_input(content),
            )
            .await?
            .stdout;

        // Keep the existing mode (e.g. executable bit) when the file is
        // already tracked.
        let mode = match self.exec(&["ls-files", "--stage", "--", rel.as_str()]).await {
            Ok(result) => result
                .stdout
                .split_whitespace()
                .next()
                .map(str::to_string)
                .unwrap_or_else(|| "100644".to_string()),
            Err(err) => {
                debug!(error = %err, "ls-files failed, using default mode");
                "100644".to_string()
            }
        };

        let cacheinfo = format!("{mode},{hash},{rel}");
        self.exec(&["update-index", "--add", "--cacheinfo", cacheinfo.as_str()])
            .await?;
        Ok(())
    }

    /// `git rm -- <paths>`.
    pub async fn rm(&self, paths: &[PathBuf]) -> GitResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        self.exec_batched(&["rm".to_string()], &self.path_args(paths))
            .await
    }

    /// Unstage `paths`, resetting their index entries to `treeish`.
    ///
    /// Before the first commit there is nothing to reset to, so entries are
    /// removed from the index instead.
    pub async fn revert_files(&self, treeish: &str, paths: &[PathBuf]) -> GitResult<()> {
        let has_branches = !self.exec(&["branch"]).await?.stdout.is_empty();
        let prefix: Vec<String> = if has_branches {
            vec!["reset".into(), "-q".into(), treeish.into()]
        } else {
            vec!["rm".into(), "--cached".into(), "-r".into()]
        };
        let paths = if paths.is_empty() {
            vec![".".to_string()]
        } else {
            self.path_args(paths)
        };
        self.exec_batched(&prefix, &paths).await
    }

    /// `git reset --soft|--hard <treeish>`.
    pub async fn reset(&self, treeish: &str, hard: bool) -> GitResult<()> {
        let mode = if hard { "--hard" } else { "--soft" };
        self.exec(&["reset", mode, treeish]).await?;
        Ok(())
    }

    /// Remove untracked `paths` from the working tree.
    pub async fn clean(&self, paths: &[PathBuf]) -> GitResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let prefix = vec!["clean".to_string(), "-f".to_string(), "-q".to_string()];
        self.exec_batched(&prefix, &self.path_args(paths)).await
    }

    /// `git apply [-R] <patch>`.
    pub async fn apply(&self, patch: &Path, reverse: bool) -> GitResult<()> {
        let mut args = vec!["apply".to_string()];
        if reverse {
            args.push("-R".into());
        }
        args.push(patch.to_string_lossy().into_owned());
        self.exec(&args)
            .await
            .map(|_| ())
            .map_err(|e| refine(e, &APPLY_RULES))
    }

    /// Create a commit.
    ///
    /// The message travels on stdin. Without a message and without an
    /// editor, amending keeps the old message and a new commit gets an empty
    /// one.
    pub async fn commit(&self, message: Option<&str>, opts: &CommitOptions) -> GitResult<()> {
        let mut args: Vec<String> = Vec::new();
        if self.require_user_config {
            args.extend(["-c".into(), "user.useConfigOnly=true".into()]);
        }
        args.extend(["commit".into(), "--quiet".into()]);

        let message = message.filter(|m| !m.is_empty());
        let mut options = ExecOptions::default();
        if let Some(message) = message {
            options.input = Some(message.to_string());
            args.extend(["--file".into(), "-".into()]);
        }
        if opts.verbose {
            args.push("--verbose".into());
        }
        if opts.all {
            args.push("--all".into());
        }
        if opts.amend {
            args.push("--amend".into());
        }
        if !opts.use_editor {
            if message.is_none() {
                if opts.amend {
                    args.push("--no-edit".into());
                } else {
                    options.input = Some(String::new());
                    args.extend(["--file".into(), "-".into()]);
                }
            }
            args.push("--allow-empty-message".into());
        }
        if opts.signoff {
            args.push("--signoff".into());
        }
        if opts.sign {
            args.push("-S".into());
        }
        if opts.empty {
            args.push("--allow-empty".into());
        }
        if opts.no_verify {
            args.push("--no-verify".into());
        }

        match self.exec_with(&args, options).await {
            Ok(_) => Ok(()),
            Err(err) => Err(self.commit_error(err).await),
        }
    }

    /// Refine a commit failure, probing user identity for generic ones.
    async fn commit_error(&self, err: GitError) -> GitError {
        let err = refine(err, &COMMIT_RULES);
        if err.kind.is_some() {
            return err;
        }
        if !self.has_config("user.name").await {
            return err.with_kind(GitErrorKind::NoUserNameConfigured);
        }
        if !self.has_config("user.email").await {
            return err.with_kind(GitErrorKind::NoUserEmailConfigured);
        }
        if err.stderr.contains("Please tell me who you are") {
            return err.with_kind(GitErrorKind::NoUserNameConfigured);
        }
        err
    }

    /// A key counts as set only when git prints a non-empty value for it.
    async fn has_config(&self, key: &str) -> bool {
        match self.exec(&["config", "--get", key]).await {
            Ok(out) => !out.stdout.trim().is_empty(),
            Err(_) => false,
        }
    }
}
