//! git::parse
//!
//! Pure parsers from git's porcelain output to typed records.
//!
//! Nothing here spawns processes or touches the filesystem. Malformed input
//! degrades to skipped records (with a warning where useful) and never
//! panics.

pub mod config;
pub mod listing;
pub mod log;
pub mod refs;
pub mod status;

pub use config::{parse_config, parse_gitmodules, parse_remotes_from_config, ConfigSection};
pub use listing::{parse_remote_verbose, parse_stashes, parse_worktrees, STASH_FORMAT};
pub use log::{parse_commits, parse_short_stat, COMMIT_FORMAT};
pub use refs::{
    parse_ahead_behind, parse_branch_details, parse_left_right_count, parse_refs,
    parse_upstream_short, BRANCH_FORMAT, REFS_FORMAT,
};
pub use status::{parse_status, RawStatusEntry, StatusParser};
