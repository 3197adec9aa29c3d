//! core
//!
//! Core domain types, settings, and path routing.
//!
//! # Modules
//!
//! - [`types`] - Parsed records: Ref, Branch, Commit, Remote, etc.
//! - [`version`] - Installed git version and feature gates
//! - [`config`] - Engine settings schema and loading
//! - [`paths`] - Centralized routing for `.git` files read directly
//!
//! # Design Principles
//!
//! - Parsed records are immutable and compare structurally
//! - Settings are strict and validated on load

pub mod config;
pub mod paths;
pub mod types;
pub mod version;
