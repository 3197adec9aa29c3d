//! git
//!
//! Everything that talks to the git executable.
//!
//! # Architecture
//!
//! This module is the **only doorway** to git. Nothing outside it builds
//! argument vectors, parses porcelain output or reads `.git` files.
//!
//! Leaf first:
//!
//! - [`process`], [`fs`]: injected collaborators for spawning and file reads
//! - [`runner`]: version-aware command runner
//! - [`parse`]: pure porcelain parsers
//! - [`error`], [`classify`]: failure record and stderr classification
//! - [`repository`]: one method per verb over a working tree
//! - [`mock`]: scripted collaborators for tests
//!
//! # Invariants
//!
//! - Every invocation goes through [`runner::GitRunner`]
//! - Every failure is a [`GitError`] whose kind comes from [`classify`]
//! - No process is spawned except through a [`process::ProcessSpawner`]
//!
//! # Example
//!
//! ```ignore
//! use gitdeck::core::config::EngineConfig;
//! use gitdeck::git::{GitRunner, Repository, TokioFileSystem, TokioSpawner};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let config = EngineConfig::default();
//! let runner = Arc::new(GitRunner::detect(Arc::new(TokioSpawner), &config).await);
//! let repo = Repository::open(runner, Arc::new(TokioFileSystem), Path::new("."), &config).await?;
//! let head = repo.get_head().await?;
//! ```

pub mod classify;
pub mod error;
pub mod fs;
pub mod mock;
pub mod parse;
pub mod process;
pub mod repository;
pub mod runner;

pub use error::{GitError, GitErrorKind, GitResult};
pub use fs::{FileSystem, TokioFileSystem};
pub use process::{ExecOptions, ProcessSpawner, ProcessStream, RawOutput, StreamEvent, TokioSpawner};
pub use repository::{ForcePushMode, Repository, StatusOptions, StatusResult};
pub use runner::{split_in_chunks, ExecResult, GitRunner};
