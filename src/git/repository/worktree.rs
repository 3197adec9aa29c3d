//! Linked worktrees.

use std::path::Path;

use super::Repository;
use crate::core::types::Worktree;
use crate::git::error::GitResult;
use crate::git::parse::parse_worktrees;

impl Repository {
    pub async fn worktrees(&self) -> GitResult<Vec<Worktree>> {
        let result = self.exec(&["worktree", "list", "--porcelain", "-z"]).await?;
        Ok(parse_worktrees(&result.stdout))
    }

    /// `git worktree add [-b branch] <path> [commitish]`.
    pub async fn add_worktree(
        &self,
        path: &Path,
        branch: Option<&str>,
        commitish: Option<&str>,
    ) -> GitResult<()> {
        let mut args = vec!["worktree".to_string(), "add".to_string()];
        if let Some(branch) = branch {
            args.push("-b".into());
            args.push(branch.to_string());
        }
        args.push(path.to_string_lossy().into_owned());
        if let Some(commitish) = commitish {
            args.push(commitish.to_string());
        }
        self.exec(&args).await?;
        Ok(())
    }

    pub async fn delete_worktree(&self, path: &Path, force: bool) -> GitResult<()> {
        let mut args = vec!["worktree".to_string(), "remove".to_string()];
        if force {
            args.push("--force".into());
        }
        args.push(path.to_string_lossy().into_owned());
        self.exec(&args).await?;
        Ok(())
    }
}
