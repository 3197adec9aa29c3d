//! core::config::schema
//!
//! Engine settings schema.
//!
//! # Example
//!
//! ```toml
//! git_path = "/usr/bin/git"
//! status_limit = 10000
//! untracked_changes = "separate"
//! command_log_watch = ["status", "for-each-ref"]
//!
//! [refresh]
//! file_change_debounce_ms = 1000
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing: limits must be non-zero and the git
//! path must not be empty.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// How untracked files are bucketed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UntrackedPolicy {
    /// Untracked files appear in the working-tree bucket.
    #[default]
    Mixed,
    /// Untracked files get their own bucket.
    Separate,
    /// Untracked files are not shown.
    Hidden,
}

/// Settings for the repository engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Git executable; resolved through `PATH` when relative.
    pub git_path: PathBuf,

    /// Maximum number of status entries before the stream is cut off and
    /// the repository is flagged as huge.
    pub status_limit: usize,

    /// Bucketing of untracked files.
    pub untracked_changes: UntrackedPolicy,

    /// Include ignored files in status.
    pub show_ignored: bool,

    /// Subcommands whose full stdout is written to the debug log.
    pub command_log_watch: Vec<String>,

    /// Upper bound on the combined length of path arguments per invocation.
    pub max_cli_length: usize,

    /// Pass `-c user.useConfigOnly=true` to commit.
    pub require_user_config: bool,

    /// Refresh tuning.
    pub refresh: RefreshConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            git_path: PathBuf::from("git"),
            status_limit: 10_000,
            untracked_changes: UntrackedPolicy::default(),
            show_ignored: false,
            command_log_watch: Vec::new(),
            max_cli_length: 30_000,
            require_user_config: true,
            refresh: RefreshConfig::default(),
        }
    }
}

/// Refresh and retry timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RefreshConfig {
    /// Quiet period after the last file-change notification.
    pub file_change_debounce_ms: u64,

    /// Base unit of the quadratic retry backoff.
    pub retry_base_delay_ms: u64,

    /// Attempts before a retryable failure surfaces.
    pub retry_attempts: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            file_change_debounce_ms: 1000,
            retry_base_delay_ms: 50,
            retry_attempts: 10,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.git_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue("git_path cannot be empty".into()));
        }
        if self.status_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "status_limit must be greater than zero".into(),
            ));
        }
        if self.max_cli_length == 0 {
            return Err(ConfigError::InvalidValue(
                "max_cli_length must be greater than zero".into(),
            ));
        }
        if self.refresh.retry_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "refresh.retry_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// True when stdout of `subcommand` should be logged in full.
    pub fn watches(&self, subcommand: &str) -> bool {
        self.command_log_watch.iter().any(|c| c == subcommand)
    }
}
