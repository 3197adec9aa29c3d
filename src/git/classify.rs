//! git::classify
//!
//! Ordered stderr/stdout pattern rules mapping git failures to
//! [`GitErrorKind`].
//!
//! # Architecture
//!
//! Two layers of rules exist, both defined here and nowhere else:
//!
//! - [`GLOBAL_RULES`] run on every failed invocation inside the runner.
//! - Per-verb tables ([`PUSH_RULES`], [`PULL_RULES`], ...) run afterwards in
//!   the repository method for that verb. A verb rule that matches replaces
//!   the global kind; when none matches the global kind stands.
//!
//! Within a table the first matching rule wins. A rule matches when every
//! one of its patterns matches its source stream and its condition holds
//! for the invocation.
//!
//! New failure shapes are added by extending these tables.

use std::sync::LazyLock;

use regex::Regex;

use super::error::{GitError, GitErrorKind};
use super::repository::ForcePushMode;

/// Stream a rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Stdout,
    Stderr,
}

/// Extra requirement on the invocation for a rule to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Always,
    /// Push ran with `--force-with-lease`.
    ForceWithLease,
    /// Push ran with `--force-with-lease --force-if-includes`.
    ForceWithLeaseIfIncludes,
}

/// Facts about the invocation that conditions test.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyContext {
    pub force_push_mode: Option<ForcePushMode>,
}

/// One classification rule.
#[derive(Debug)]
pub struct Rule {
    pub source: Source,
    pub patterns: Vec<Regex>,
    pub kind: GitErrorKind,
    pub condition: Condition,
}

impl Rule {
    fn new(source: Source, pattern: &str, kind: GitErrorKind) -> Self {
        Self::all(source, &[pattern], kind, Condition::Always)
    }

    fn all(source: Source, patterns: &[&str], kind: GitErrorKind, condition: Condition) -> Self {
        Self {
            source,
            patterns: patterns
                .iter()
                .map(|p| Regex::new(p).expect("static classifier pattern"))
                .collect(),
            kind,
            condition,
        }
    }

    fn stderr(pattern: &str, kind: GitErrorKind) -> Self {
        Self::new(Source::Stderr, pattern, kind)
    }

    fn stdout(pattern: &str, kind: GitErrorKind) -> Self {
        Self::new(Source::Stdout, pattern, kind)
    }

    fn applies(&self, ctx: &ClassifyContext) -> bool {
        match self.condition {
            Condition::Always => true,
            Condition::ForceWithLease => ctx.force_push_mode == Some(ForcePushMode::ForceWithLease),
            Condition::ForceWithLeaseIfIncludes => {
                ctx.force_push_mode == Some(ForcePushMode::ForceWithLeaseIfIncludes)
            }
        }
    }

    fn matches(&self, stdout: &str, stderr: &str, ctx: &ClassifyContext) -> bool {
        if !self.applies(ctx) {
            return false;
        }
        let text = match self.source {
            Source::Stdout => stdout,
            Source::Stderr => stderr,
        };
        self.patterns.iter().all(|p| p.is_match(text))
    }
}

const LOCKED: &str = r"Another git process seems to be running in this repository|If no other git process is currently running|Unable to create '[^']*\.lock': File exists";
const CANT_LOCK_REF: &str = r"(?i)cannot lock ref|unable to update local ref";
const REMOTE_CONNECTION: &str = r"Could not read from remote repository";
const TAG_CLOBBER: &str = r"(?m)! \[rejected\].*\(would clobber existing tag\)";
const MULTIPLE_BRANCHES: &str = r"(?i)cannot rebase onto multiple branches";
const FF_REJECTED: &str = r"Not possible to fast-forward, aborting";
const CONFLICT: &str = r"(?m)^CONFLICT \([^)]+\): \b";
const FAILED_TO_PUSH: &str = r"(?m)^error: failed to push some refs to\b";

/// Rules applied to every failed invocation.
pub static GLOBAL_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use GitErrorKind::*;
    vec![
        Rule::stderr(CANT_LOCK_REF, CantLockRef),
        Rule::stderr(LOCKED, RepositoryIsLocked),
        Rule::stderr(r"(?i)Authentication failed", AuthenticationFailed),
        Rule::stderr(r"(?i)Not a git repository", NotAGitRepository),
        Rule::stderr(r"bad config file", BadConfigFile),
        Rule::stderr(
            r"cannot make pipe for command substitution|cannot create standard input pipe",
            CantCreatePipe,
        ),
        Rule::stderr(r"Repository not found", RepositoryNotFound),
        Rule::stderr(r"unable to access", CantAccessRemote),
        Rule::stderr(r"branch '.+' is not fully merged", BranchNotFullyMerged),
        Rule::stderr(r"Couldn't find remote ref", NoRemoteReference),
        Rule::stderr(r"A branch named '.+' already exists", BranchAlreadyExists),
        Rule::stderr(r"'.+' is not a valid branch name", InvalidBranchName),
        Rule::stderr(r"Please,? commit your changes or stash them", DirtyWorkTree),
        Rule::stderr(
            r"detected dubious ownership in repository at",
            NotASafeGitRepository,
        ),
        Rule::stderr(
            r"contains modified or untracked files|use --force to delete it",
            WorktreeContainsChanges,
        ),
        Rule::stderr(r"fatal: '[^']+' already exists", WorktreeAlreadyExists),
        Rule::stderr(
            r"is already used by worktree at|is already checked out at",
            WorktreeBranchAlreadyUsed,
        ),
    ]
});

/// `git commit`
pub static COMMIT_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use GitErrorKind::*;
    vec![
        Rule::stderr(r"not possible because you have unmerged files", UnmergedChanges),
        Rule::stderr(r"Aborting commit due to empty commit message", EmptyCommitMessage),
        Rule::stderr(r"no name was given and auto-detection is disabled|empty ident name", NoUserNameConfigured),
        Rule::stderr(
            r"no email was given and auto-detection is disabled|unable to auto-detect email address",
            NoUserEmailConfigured,
        ),
    ]
});

/// `git checkout`
pub static CHECKOUT_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use GitErrorKind::*;
    vec![
        Rule::stderr(r"Please,? commit your changes or stash them", DirtyWorkTree),
        Rule::stderr(
            r"Your local changes to the following files would be overwritten by checkout",
            DirtyWorkTree,
        ),
        Rule::stderr(r"You are on a branch yet to be born", BranchNotYetBorn),
    ]
});

/// `git push`
pub static PUSH_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use GitErrorKind::*;
    vec![
        Rule::all(
            Source::Stderr,
            &[FAILED_TO_PUSH, r"(?m)! \[rejected\].*\(stale info\)"],
            ForcePushWithLeaseRejected,
            Condition::ForceWithLease,
        ),
        Rule::all(
            Source::Stderr,
            &[
                FAILED_TO_PUSH,
                r"(?m)! \[rejected\].*\(remote ref updated since checkout\)",
            ],
            ForcePushWithLeaseIfIncludesRejected,
            Condition::ForceWithLeaseIfIncludes,
        ),
        Rule::stderr(FAILED_TO_PUSH, PushRejected),
        Rule::stderr(r"Permission.*denied", PermissionDenied),
        Rule::stderr(REMOTE_CONNECTION, RemoteConnectionError),
        Rule::stderr(
            r"(?m)^fatal: The current branch .* has no upstream branch",
            NoUpstreamBranch,
        ),
    ]
});

/// `git pull`
pub static PULL_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use GitErrorKind::*;
    vec![
        Rule::stdout(CONFLICT, Conflict),
        Rule::stderr(r"Please tell me who you are\.", NoUserNameConfigured),
        Rule::stderr(REMOTE_CONNECTION, RemoteConnectionError),
        Rule::stderr(
            r"(?i)Pull(?:ing)? is not possible because you have unmerged files|Cannot pull with rebase: You have unstaged changes|Your local changes to the following files would be overwritten|Please, commit your changes before you can merge",
            DirtyWorkTree,
        ),
        Rule::stderr(CANT_LOCK_REF, CantLockRef),
        Rule::stderr(MULTIPLE_BRANCHES, CantRebaseMultipleBranches),
        Rule::stderr(TAG_CLOBBER, TagConflict),
        Rule::stderr(FF_REJECTED, FastForwardRejected),
    ]
});

/// `git fetch`
pub static FETCH_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use GitErrorKind::*;
    vec![
        Rule::stderr(r"No remote repository specified\.", NoRemoteRepositorySpecified),
        Rule::stderr(REMOTE_CONNECTION, RemoteConnectionError),
        Rule::stderr(TAG_CLOBBER, TagConflict),
        Rule::stderr(CANT_LOCK_REF, CantLockRef),
    ]
});

/// `git merge`
pub static MERGE_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use GitErrorKind::*;
    vec![
        Rule::stdout(r"(?m)^CONFLICT ", Conflict),
        Rule::stderr(FF_REJECTED, FastForwardRejected),
        Rule::stderr(
            r"Your local changes to the following files would be overwritten by merge",
            DirtyWorkTree,
        ),
    ]
});

/// `git rebase`
pub static REBASE_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use GitErrorKind::*;
    vec![
        Rule::stdout(CONFLICT, Conflict),
        Rule::stderr(CONFLICT, Conflict),
        Rule::stderr(MULTIPLE_BRANCHES, CantRebaseMultipleBranches),
        Rule::stderr(
            r"cannot rebase: You have unstaged changes|Please commit or stash them",
            DirtyWorkTree,
        ),
    ]
});

/// `git cherry-pick`
pub static CHERRY_PICK_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use GitErrorKind::*;
    vec![
        Rule::stdout(r"(?m)^CONFLICT ", Conflict),
        Rule::stderr(r"(?m)^error: could not apply", Conflict),
        Rule::stderr(
            r"Your local changes would be overwritten by cherry-pick",
            DirtyWorkTree,
        ),
    ]
});

/// `git stash pop` / `git stash apply`
pub static STASH_APPLY_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use GitErrorKind::*;
    vec![
        Rule::stderr(r"No stash found|is not a valid reference", NoStashFound),
        Rule::stderr(
            r"error: Your local changes to the following files would be overwritten",
            LocalChangesOverwritten,
        ),
        Rule::stdout(r"(?m)^CONFLICT", StashConflict),
    ]
});

/// `git stash push`
pub static STASH_PUSH_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use GitErrorKind::*;
    vec![
        Rule::stderr(r"No local changes to save", NoLocalChanges),
        Rule::stdout(r"No local changes to save", NoLocalChanges),
    ]
});

/// `git apply`
pub static APPLY_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![Rule::stderr(
        r"patch does not apply",
        GitErrorKind::PatchDoesNotApply,
    )]
});

/// `git add`
pub static ADD_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![Rule::stderr(r"is in submodule", GitErrorKind::IsInSubmodule)]
});

/// First matching rule's kind, or `None`.
pub fn classify(
    rules: &[Rule],
    stdout: &str,
    stderr: &str,
    ctx: &ClassifyContext,
) -> Option<GitErrorKind> {
    rules
        .iter()
        .find(|rule| rule.matches(stdout, stderr, ctx))
        .map(|rule| rule.kind)
}

/// Kind from the global rules.
pub fn classify_global(stdout: &str, stderr: &str) -> Option<GitErrorKind> {
    classify(&GLOBAL_RULES, stdout, stderr, &ClassifyContext::default())
}

/// Re-classify `err` with a verb's rule table.
///
/// A matching verb rule replaces the current kind; otherwise `err` is
/// returned unchanged.
pub fn refine(err: GitError, rules: &[Rule]) -> GitError {
    refine_with(err, rules, &ClassifyContext::default())
}

/// [`refine`] with invocation facts for conditional rules.
pub fn refine_with(mut err: GitError, rules: &[Rule], ctx: &ClassifyContext) -> GitError {
    if let Some(kind) = classify(rules, &err.stdout, &err.stderr, ctx) {
        err.kind = Some(kind);
    }
    err
}
