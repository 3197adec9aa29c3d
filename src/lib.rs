//! Gitdeck - a repository engine for source-control panels
//!
//! Gitdeck drives the installed `git` executable to answer the questions a
//! source-control view asks (what changed, which branch, which remotes) and
//! to perform the mutations it offers (stage, commit, sync, stash, ...).
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Repository model: snapshots, operation ledger, retries, refresh
//! - [`core`] - Domain types, settings, git version gates, `.git` path routing
//! - [`git`] - Process spawning, error classification, output parsing, verbs
//!
//! # Correctness Invariants
//!
//! 1. Every git process goes through a single runner and spawner seam
//! 2. Every mutation is tracked by the operation ledger and followed by a refresh
//! 3. Published snapshots are immutable; subscribers see whole snapshots only
//! 4. A disposed model never spawns another process

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
