//! engine
//!
//! Coordinates requests against one repository.
//!
//! # Architecture
//!
//! The engine sits between a panel and [`crate::git`]. Reads flow one way,
//! writes round-trip:
//!
//! ```text
//! read:   Repository ─▶ parsers ─▶ RepositoryModel ─▶ observers
//! write:  RepositoryModel ─▶ retry ─▶ Repository ─▶ git ─▶ refresh
//! ```
//!
//! - [`operation`]: the verb table (read-only, retry and progress flags)
//! - [`ledger`]: which operations are running, and when the repository is idle
//! - [`retry`]: quadratic backoff for lock contention
//! - [`resource`]: the four change buckets derived from status
//! - [`model`]: the observable model every verb goes through
//!
//! # Invariants
//!
//! - Every model verb runs through [`RepositoryModel::run`]
//! - A disposed model never spawns git
//! - Snapshots are immutable and replaced wholesale
//!
//! # Example
//!
//! ```ignore
//! use gitdeck::core::config::EngineConfig;
//! use gitdeck::engine::{Collaborators, RepositoryModel};
//!
//! let model = RepositoryModel::open(Path::new("."), Collaborators::system(), EngineConfig::default()).await?;
//! let mut snapshots = model.subscribe();
//! while snapshots.changed().await.is_ok() {
//!     let snapshot = snapshots.borrow_and_update().clone();
//!     render(&snapshot);
//! }
//! ```

pub mod ledger;
pub mod model;
pub mod operation;
pub mod resource;
pub mod retry;

pub use ledger::{OperationEvent, OperationGuard, OperationLedger};
pub use model::{Collaborators, RepositorySnapshot, RepositoryState, RepositoryModel};
pub use operation::{Operation, OperationKind};
pub use resource::{Resource, ResourceGroupKind, ResourceGroups, Status};
pub use retry::{retry, RetryPolicy};

use thiserror::Error;

use crate::core::config::ConfigError;
use crate::git::{GitError, GitErrorKind};

/// Errors surfaced by the repository model.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A git invocation failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// The repository went away; the model accepts no more work.
    #[error("repository is disposed")]
    Disposed,

    /// Settings were rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Classified kind of an underlying git failure.
    pub fn git_kind(&self) -> Option<GitErrorKind> {
        match self {
            Self::Git(err) => err.kind,
            _ => None,
        }
    }
}

/// Result type for model operations.
pub type EngineResult<T> = Result<T, EngineError>;
