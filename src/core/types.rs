//! core::types
//!
//! Typed records produced by the porcelain parsers.
//!
//! # Types
//!
//! - [`Ref`] - A branch, remote-tracking branch, or tag
//! - [`Branch`] - A ref plus upstream and ahead/behind counts
//! - [`Commit`] - One entry of a commit log
//! - [`Remote`] - A configured remote with fetch/push URLs
//! - [`Submodule`] - An entry of `.gitmodules`
//! - [`Stash`] - One entry of `git stash list`
//! - [`Worktree`] - One linked worktree
//!
//! All records are immutable once parsed and compare structurally.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefType {
    /// A local branch (`refs/heads/*`).
    Head,
    /// A remote-tracking branch (`refs/remotes/<remote>/*`).
    RemoteHead,
    /// A tag (`refs/tags/*`).
    Tag,
}

/// A git reference.
///
/// `name` is the short name (`main`, `origin/main`, `v1.0`). A detached HEAD
/// has no name but carries a commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ref {
    /// The kind of ref.
    pub ref_type: RefType,
    /// Short name, absent for a detached HEAD.
    pub name: Option<String>,
    /// Commit the ref points at (peeled for annotated tags).
    pub commit: Option<String>,
    /// Remote name for remote-tracking branches.
    pub remote: Option<String>,
    /// Subject of the referenced commit, when the listing included it.
    pub commit_summary: Option<String>,
}

impl Ref {
    /// Create a local branch ref.
    pub fn head(name: impl Into<String>, commit: Option<String>) -> Self {
        Self {
            ref_type: RefType::Head,
            name: Some(name.into()),
            commit,
            remote: None,
            commit_summary: None,
        }
    }

    /// Create a detached HEAD ref.
    pub fn detached(commit: impl Into<String>) -> Self {
        Self {
            ref_type: RefType::Head,
            name: None,
            commit: Some(commit.into()),
            remote: None,
            commit_summary: None,
        }
    }

    /// True when this is a HEAD without a branch name.
    pub fn is_detached(&self) -> bool {
        self.ref_type == RefType::Head && self.name.is_none()
    }
}

/// Upstream of a branch: `<remote>/<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpstreamRef {
    /// Remote name (`origin`).
    pub remote: String,
    /// Branch name on the remote (`main`).
    pub name: String,
}

impl fmt::Display for UpstreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.remote, self.name)
    }
}

/// A branch with its tracking information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// The underlying ref (Head or RemoteHead).
    #[serde(flatten)]
    pub reference: Ref,
    /// Configured upstream, if any.
    pub upstream: Option<UpstreamRef>,
    /// Commits on this branch not on the upstream.
    pub ahead: Option<u32>,
    /// Commits on the upstream not on this branch.
    pub behind: Option<u32>,
}

impl Branch {
    /// Wrap a ref without tracking information.
    pub fn from_ref(reference: Ref) -> Self {
        Self {
            reference,
            upstream: None,
            ahead: None,
            behind: None,
        }
    }

    /// Short name of the branch.
    pub fn name(&self) -> Option<&str> {
        self.reference.name.as_deref()
    }

    /// Commit the branch points at.
    pub fn commit(&self) -> Option<&str> {
        self.reference.commit.as_deref()
    }
}

/// `--shortstat` summary attached to a commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitShortStat {
    pub files: u32,
    pub insertions: u32,
    pub deletions: u32,
}

/// One commit from `git log`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    /// Full message; exactly one trailing newline has been stripped.
    pub message: String,
    pub parents: Vec<String>,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub author_date: Option<DateTime<Utc>>,
    pub commit_date: Option<DateTime<Utc>>,
    /// Decorating ref names (`HEAD -> main`, `origin/main`, `tag: v1`).
    pub ref_names: Vec<String>,
    pub short_stat: Option<CommitShortStat>,
}

impl Commit {
    /// First line of the message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

/// A configured remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    pub name: String,
    pub fetch_url: Option<String>,
    pub push_url: Option<String>,
    /// Push is disabled (`DISABLE` / `no_push` push URL).
    pub is_read_only: bool,
}

/// A submodule declared in `.gitmodules`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submodule {
    pub name: String,
    pub path: String,
    pub url: String,
}

/// One entry of `git stash list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stash {
    pub index: usize,
    pub description: String,
    pub branch_name: Option<String>,
    pub commit_date: Option<DateTime<Utc>>,
}

/// A linked worktree from `git worktree list --porcelain -z`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worktree {
    /// Final component of the worktree path.
    pub name: String,
    pub path: PathBuf,
    /// Full ref name checked out in the worktree.
    pub reference: Option<String>,
    pub commit: Option<String>,
    pub detached: bool,
    pub is_main: bool,
}
