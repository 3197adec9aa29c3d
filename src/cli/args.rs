//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--cwd <path>`: Open the repository containing that directory
//! - `--debug`: Enable debug logging
//! - `--config <path>`: Settings file, overriding the usual locations
//! - `--json`: Print machine-readable output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// gitdeck - inspect a repository the way a source-control panel sees it
#[derive(Parser, Debug)]
#[command(name = "gitdeck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if gitdeck was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Settings file to use instead of the default locations
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show HEAD, in-progress operations and the change buckets
    Status,

    /// Show recent commits
    Log {
        /// Number of commits to show
        #[arg(short = 'n', long = "max-count", default_value_t = 10)]
        max_count: usize,

        /// Revision range, e.g. main..topic
        range: Option<String>,
    },

    /// List local branches, remote branches and tags
    Branches,

    /// List configured remotes
    Remotes,

    /// Show gitdeck and git versions
    Version,
}
