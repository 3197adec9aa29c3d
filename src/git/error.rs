//! git::error
//!
//! Error record for failed git invocations.
//!
//! # Error Handling
//!
//! Every failed invocation becomes a [`GitError`] carrying the command line,
//! exit code, captured output and an optional [`GitErrorKind`]. The kind is
//! assigned by [`crate::git::classify`]; a failure no rule recognizes has no
//! kind and is surfaced as-is. Callers decide messaging from the kind.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Closed taxonomy of recognized git failures.
///
/// Grown only together with a rule in [`crate::git::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GitErrorKind {
    RepositoryIsLocked,
    NotAGitRepository,
    RepositoryNotFound,
    AuthenticationFailed,
    BadConfigFile,
    CantCreatePipe,
    CantAccessRemote,
    NoRemoteReference,
    BranchAlreadyExists,
    BranchNotFullyMerged,
    InvalidBranchName,
    NotASafeGitRepository,
    WorktreeContainsChanges,
    WorktreeAlreadyExists,
    WorktreeBranchAlreadyUsed,
    DirtyWorkTree,
    BranchNotYetBorn,
    UnmergedChanges,
    EmptyCommitMessage,
    NoUserNameConfigured,
    NoUserEmailConfigured,
    Conflict,
    NoRemoteRepositorySpecified,
    RemoteConnectionError,
    FastForwardRejected,
    NoStashFound,
    NoLocalChanges,
    StashConflict,
    LocalChangesOverwritten,
    PushRejected,
    ForcePushWithLeaseRejected,
    ForcePushWithLeaseIfIncludesRejected,
    PermissionDenied,
    NoUpstreamBranch,
    TagConflict,
    CantLockRef,
    CantRebaseMultipleBranches,
    PatchDoesNotApply,
    IsInSubmodule,
}

impl GitErrorKind {
    /// Stable identifier for the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            GitErrorKind::RepositoryIsLocked => "RepositoryIsLocked",
            GitErrorKind::NotAGitRepository => "NotAGitRepository",
            GitErrorKind::RepositoryNotFound => "RepositoryNotFound",
            GitErrorKind::AuthenticationFailed => "AuthenticationFailed",
            GitErrorKind::BadConfigFile => "BadConfigFile",
            GitErrorKind::CantCreatePipe => "CantCreatePipe",
            GitErrorKind::CantAccessRemote => "CantAccessRemote",
            GitErrorKind::NoRemoteReference => "NoRemoteReference",
            GitErrorKind::BranchAlreadyExists => "BranchAlreadyExists",
            GitErrorKind::BranchNotFullyMerged => "BranchNotFullyMerged",
            GitErrorKind::InvalidBranchName => "InvalidBranchName",
            GitErrorKind::NotASafeGitRepository => "NotASafeGitRepository",
            GitErrorKind::WorktreeContainsChanges => "WorktreeContainsChanges",
            GitErrorKind::WorktreeAlreadyExists => "WorktreeAlreadyExists",
            GitErrorKind::WorktreeBranchAlreadyUsed => "WorktreeBranchAlreadyUsed",
            GitErrorKind::DirtyWorkTree => "DirtyWorkTree",
            GitErrorKind::BranchNotYetBorn => "BranchNotYetBorn",
            GitErrorKind::UnmergedChanges => "UnmergedChanges",
            GitErrorKind::EmptyCommitMessage => "EmptyCommitMessage",
            GitErrorKind::NoUserNameConfigured => "NoUserNameConfigured",
            GitErrorKind::NoUserEmailConfigured => "NoUserEmailConfigured",
            GitErrorKind::Conflict => "Conflict",
            GitErrorKind::NoRemoteRepositorySpecified => "NoRemoteRepositorySpecified",
            GitErrorKind::RemoteConnectionError => "RemoteConnectionError",
            GitErrorKind::FastForwardRejected => "FastForwardRejected",
            GitErrorKind::NoStashFound => "NoStashFound",
            GitErrorKind::NoLocalChanges => "NoLocalChanges",
            GitErrorKind::StashConflict => "StashConflict",
            GitErrorKind::LocalChangesOverwritten => "LocalChangesOverwritten",
            GitErrorKind::PushRejected => "PushRejected",
            GitErrorKind::ForcePushWithLeaseRejected => "ForcePushWithLeaseRejected",
            GitErrorKind::ForcePushWithLeaseIfIncludesRejected => {
                "ForcePushWithLeaseIfIncludesRejected"
            }
            GitErrorKind::PermissionDenied => "PermissionDenied",
            GitErrorKind::NoUpstreamBranch => "NoUpstreamBranch",
            GitErrorKind::TagConflict => "TagConflict",
            GitErrorKind::CantLockRef => "CantLockRef",
            GitErrorKind::CantRebaseMultipleBranches => "CantRebaseMultipleBranches",
            GitErrorKind::PatchDoesNotApply => "PatchDoesNotApply",
            GitErrorKind::IsInSubmodule => "IsInSubmodule",
        }
    }
}

impl fmt::Display for GitErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed git invocation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GitError {
    /// Recognized failure kind, if any rule matched.
    pub kind: Option<GitErrorKind>,
    /// Human-readable summary.
    pub message: String,
    /// The command line, without the executable (`push origin main`).
    pub command: Option<String>,
    /// Process exit code; `None` when the process could not be spawned or
    /// was killed.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl GitError {
    /// Error for a process that exited unsuccessfully.
    pub fn failed(command: &[String], exit_code: Option<i32>, stdout: String, stderr: String) -> Self {
        let command = command.join(" ");
        let message = match exit_code {
            Some(code) => format!("git {command} failed with exit code {code}"),
            None => format!("git {command} was terminated"),
        };
        Self {
            kind: None,
            message,
            command: Some(command),
            exit_code,
            stdout,
            stderr,
        }
    }

    /// Error for a process that could not be spawned or read.
    pub fn spawn(command: &[String], err: &std::io::Error) -> Self {
        let command = command.join(" ");
        Self {
            kind: None,
            message: format!("failed to run git {command}: {err}"),
            command: Some(command),
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Error raised by the engine without a process behind it.
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: None,
            message: message.into(),
            command: None,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Set the failure kind, replacing any earlier classification.
    pub fn with_kind(mut self, kind: GitErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn is(&self, kind: GitErrorKind) -> bool {
        self.kind == Some(kind)
    }
}

/// Result type for git operations.
pub type GitResult<T> = Result<T, GitError>;
