//! engine::operation
//!
//! Operation kinds and their behavior flags.
//!
//! # Flags
//!
//! Every verb the model runs is tagged with an [`OperationKind`]. The kind
//! determines three flags, all looked up from [`Operation::of`]:
//!
//! - `read_only`: the operation does not change the repository, so no
//!   refresh follows it and it does not make the ledger busy
//! - `retry_eligible`: ref-lock contention and "multiple branches" rebase
//!   failures are retried (lock-file contention is retried for every kind)
//! - `show_progress`: a panel should show a progress indicator while it runs
//!
//! Adding a verb means adding a kind here and one row to the table.

use std::fmt;

use serde::Serialize;

/// Every verb the repository model runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Add,
    Apply,
    Blame,
    Branch,
    CheckIgnore,
    Checkout,
    CherryPick,
    Clean,
    Commit,
    Config,
    DeleteBranch,
    DeleteTag,
    DeleteWorktree,
    Fetch,
    GetBranch,
    GetCommit,
    GetConfig,
    GetRefs,
    GetStashes,
    Log,
    Merge,
    MergeAbort,
    MergeBase,
    Pull,
    Push,
    Rebase,
    RebaseAbort,
    RebaseContinue,
    Refresh,
    Remote,
    RenameBranch,
    Reset,
    RevertFiles,
    SetBranchUpstream,
    Show,
    Stage,
    Stash,
    Status,
    Sync,
    Tag,
    Worktree,
    Worktrees,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Apply => "apply",
            Self::Blame => "blame",
            Self::Branch => "branch",
            Self::CheckIgnore => "check_ignore",
            Self::Checkout => "checkout",
            Self::CherryPick => "cherry_pick",
            Self::Clean => "clean",
            Self::Commit => "commit",
            Self::Config => "config",
            Self::DeleteBranch => "delete_branch",
            Self::DeleteTag => "delete_tag",
            Self::DeleteWorktree => "delete_worktree",
            Self::Fetch => "fetch",
            Self::GetBranch => "get_branch",
            Self::GetCommit => "get_commit",
            Self::GetConfig => "get_config",
            Self::GetRefs => "get_refs",
            Self::GetStashes => "get_stashes",
            Self::Log => "log",
            Self::Merge => "merge",
            Self::MergeAbort => "merge_abort",
            Self::MergeBase => "merge_base",
            Self::Pull => "pull",
            Self::Push => "push",
            Self::Rebase => "rebase",
            Self::RebaseAbort => "rebase_abort",
            Self::RebaseContinue => "rebase_continue",
            Self::Refresh => "refresh",
            Self::Remote => "remote",
            Self::RenameBranch => "rename_branch",
            Self::Reset => "reset",
            Self::RevertFiles => "revert_files",
            Self::SetBranchUpstream => "set_branch_upstream",
            Self::Show => "show",
            Self::Stage => "stage",
            Self::Stash => "stash",
            Self::Status => "status",
            Self::Sync => "sync",
            Self::Tag => "tag",
            Self::Worktree => "worktree",
            Self::Worktrees => "worktrees",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operation kind together with its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Operation {
    pub kind: OperationKind,
    pub read_only: bool,
    pub retry_eligible: bool,
    pub show_progress: bool,
}

impl Operation {
    /// Flags for `kind`.
    pub const fn of(kind: OperationKind) -> Self {
        use OperationKind::*;

        // (read_only, retry_eligible, show_progress)
        let (read_only, retry_eligible, show_progress) = match kind {
            Blame | CheckIgnore | GetBranch | GetCommit | GetConfig | GetRefs | GetStashes
            | Log | MergeBase | Show | Worktrees => (true, false, false),
            Status => (true, false, false),
            Refresh => (false, false, false),
            Fetch | Pull | Sync => (false, true, true),
            Add | Apply | Branch | Checkout | CherryPick | Clean | Commit | Config
            | DeleteBranch | DeleteTag | DeleteWorktree | Merge | MergeAbort | Push | Rebase
            | RebaseAbort | RebaseContinue | Remote | RenameBranch | Reset | RevertFiles
            | SetBranchUpstream | Stage | Stash | Tag | Worktree => (false, false, true),
        };

        Self {
            kind,
            read_only,
            retry_eligible,
            show_progress,
        }
    }
}

impl From<OperationKind> for Operation {
    fn from(kind: OperationKind) -> Self {
        Self::of(kind)
    }
}
