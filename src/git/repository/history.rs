//! History reads and history-rewriting verbs.

use std::path::Path;

use tracing::debug;

use super::Repository;
use crate::core::types::Commit;
use crate::git::classify::{refine, CHERRY_PICK_RULES, MERGE_RULES, REBASE_RULES};
use crate::git::error::{GitError, GitResult};
use crate::git::parse::{parse_commits, parse_left_right_count, COMMIT_FORMAT};
use crate::git::process::ExecOptions;

/// Options for [`Repository::log`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    pub max_entries: usize,
    /// Revision range (`main..topic`); HEAD when unset.
    pub range: Option<String>,
    /// Restrict to commits touching this path.
    pub path: Option<String>,
    pub author: Option<String>,
    pub short_stats: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            max_entries: 32,
            range: None,
            path: None,
            author: None,
            short_stats: false,
        }
    }
}

impl Repository {
    pub async fn log(&self, opts: &LogOptions) -> GitResult<Vec<Commit>> {
        let mut args = vec![
            "log".to_string(),
            format!("--format={COMMIT_FORMAT}"),
            "-z".to_string(),
            format!("-n{}", opts.max_entries),
        ];
        if opts.short_stats {
            args.push("--shortstat".into());
        }
        if let Some(author) = &opts.author {
            args.push(format!("--author={author}"));
        }
        if let Some(range) = &opts.range {
            args.push(range.clone());
        }
        if let Some(path) = &opts.path {
            args.push("--".into());
            args.push(path.clone());
        }

        let result = self.exec(&args).await?;
        Ok(parse_commits(&result.stdout))
    }

    pub async fn get_commit(&self, reference: &str) -> GitResult<Commit> {
        let format = format!("--format={COMMIT_FORMAT}");
        let result = self
            .exec(&["show", "-s", format.as_str(), "-z", reference])
            .await?;
        parse_commits(&result.stdout)
            .into_iter()
            .next()
            .ok_or_else(|| GitError::other(format!("bad commit format for {reference}")))
    }

    /// Commits on each side of `range` (`a...b`), as `(left, right)`.
    pub async fn get_commit_count(&self, range: &str) -> GitResult<(u32, u32)> {
        let result = self
            .exec(&["rev-list", "--count", "--left-right", range])
            .await?;
        parse_left_right_count(&result.stdout)
            .ok_or_else(|| GitError::other(format!("unexpected rev-list output: {}", result.stdout)))
    }

    /// Best common ancestor, or `None` when the histories are unrelated.
    pub async fn merge_base(&self, a: &str, b: &str) -> GitResult<Option<String>> {
        match self.exec(&["merge-base", a, b]).await {
            Ok(result) if result.stdout.is_empty() => Ok(None),
            Ok(result) => Ok(Some(result.stdout)),
            Err(err) if err.exit_code == Some(1) => {
                debug!(a, b, "no merge base");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Raw bytes of `path` at `reference`.
    pub async fn show(&self, reference: &str, path: &Path) -> GitResult<Vec<u8>> {
        let object = format!("{reference}:{}", self.path_arg(path).replace('\\', "/"));
        let output = self
            .runner
            .exec_raw(&self.root, &["show", object.as_str()], ExecOptions::default())
            .await?;
        Ok(output.stdout)
    }

    pub async fn blame(&self, path: &Path) -> GitResult<String> {
        let rel = self.path_arg(path);
        Ok(self.exec(&["blame", "--", rel.as_str()]).await?.stdout)
    }

    pub async fn merge(&self, reference: &str) -> GitResult<()> {
        self.exec(&["merge", reference])
            .await
            .map(|_| ())
            .map_err(|e| refine(e, &MERGE_RULES))
    }

    pub async fn merge_abort(&self) -> GitResult<()> {
        self.exec(&["merge", "--abort"]).await?;
        Ok(())
    }

    pub async fn rebase(&self, branch: &str) -> GitResult<()> {
        self.exec(&["rebase", branch])
            .await
            .map(|_| ())
            .map_err(|e| refine(e, &REBASE_RULES))
    }

    pub async fn rebase_abort(&self) -> GitResult<()> {
        self.exec(&["rebase", "--abort"]).await?;
        Ok(())
    }

    /// Continue a rebase without opening an editor for reworded commits.
    pub async fn rebase_continue(&self) -> GitResult<()> {
        self.exec_with(
            &["rebase", "--continue"],
            ExecOptions::default().env("GIT_EDITOR", "true"),
        )
        .await
        .map(|_| ())
        .map_err(|e| refine(e, &REBASE_RULES))
    }

    pub async fn cherry_pick(&self, commit: &str) -> GitResult<()> {
        self.exec(&["cherry-pick", commit])
            .await
            .map(|_| ())
            .map_err(|e| refine(e, &CHERRY_PICK_RULES))
    }
}
