//! core::paths
//!
//! Centralized routing for the `.git` files the engine reads directly.
//!
//! # Architecture
//!
//! The engine avoids spawning git for a handful of hot reads (HEAD, remotes,
//! merge/rebase markers). Those files live in two different directories:
//! - Normal repositories (`git_dir == common_dir`)
//! - Linked worktrees (`git_dir` is `.git/worktrees/<name>/`, shared state
//!   such as `config` lives in `common_dir`)
//!
//! **Hard rule:** no code may assume `.git/` is a directory or that
//! `git_dir == common_dir`. All paths go through [`DotGit`].
//!
//! # Example
//!
//! ```
//! use gitdeck::core::paths::DotGit;
//! use std::path::PathBuf;
//!
//! let dot_git = DotGit::new(
//!     PathBuf::from("/repo/.git/worktrees/feature"),
//!     PathBuf::from("/repo/.git"),
//! );
//!
//! assert_eq!(dot_git.head_path(), PathBuf::from("/repo/.git/worktrees/feature/HEAD"));
//! assert_eq!(dot_git.config_path(), PathBuf::from("/repo/.git/config"));
//! ```

use std::path::{Path, PathBuf};

/// Location of a working tree's git directories.
///
/// # Invariants
///
/// - Shared state (`config`) uses `common_dir`
/// - Per-worktree state (`HEAD`, merge/rebase markers) uses `git_dir`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotGit {
    /// Per-worktree git directory.
    pub git_dir: PathBuf,

    /// Shared git directory (refs, objects, config).
    pub common_dir: PathBuf,
}

impl DotGit {
    pub fn new(git_dir: PathBuf, common_dir: PathBuf) -> Self {
        Self {
            git_dir,
            common_dir,
        }
    }

    // =========================================================================
    // Per-worktree paths
    // =========================================================================

    /// `<git_dir>/HEAD`
    pub fn head_path(&self) -> PathBuf {
        self.git_dir.join("HEAD")
    }

    /// `<git_dir>/MERGE_HEAD`, present while a merge is in progress.
    pub fn merge_head_path(&self) -> PathBuf {
        self.git_dir.join("MERGE_HEAD")
    }

    /// `<git_dir>/rebase-apply`, present during an `am`-style rebase.
    pub fn rebase_apply_path(&self) -> PathBuf {
        self.git_dir.join("rebase-apply")
    }

    /// `<git_dir>/rebase-merge`, present during a merge-style rebase.
    pub fn rebase_merge_path(&self) -> PathBuf {
        self.git_dir.join("rebase-merge")
    }

    /// `<git_dir>/REBASE_HEAD`
    pub fn rebase_head_path(&self) -> PathBuf {
        self.git_dir.join("REBASE_HEAD")
    }

    // =========================================================================
    // Shared paths
    // =========================================================================

    /// `<common_dir>/config`
    pub fn config_path(&self) -> PathBuf {
        self.common_dir.join("config")
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Check if this is a linked worktree (common_dir != git_dir).
    pub fn is_worktree(&self) -> bool {
        self.git_dir != self.common_dir
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn common_dir(&self) -> &Path {
        &self.common_dir
    }
}
