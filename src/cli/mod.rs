//! cli
//!
//! Debug command-line interface for gitdeck.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install logging and load settings
//! - Open a [`crate::engine::RepositoryModel`] and print what it sees
//!
//! # Architecture
//!
//! The CLI layer is thin. It never builds git argument vectors itself; every
//! read goes through the engine so the output matches what a panel would
//! show.

pub mod args;
pub mod commands;

pub use args::{Cli, Command};

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;

use crate::core::config::{Config, EngineConfig};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "GITDECK_LOG";

/// Settings shared by every command handler.
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory whose repository is opened.
    pub cwd: PathBuf,
    /// Print JSON instead of text.
    pub json: bool,
    /// Loaded engine settings.
    pub config: EngineConfig,
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.debug);

    let loaded = Config::load(cli.config.as_deref()).context("failed to load settings")?;
    if let Some(path) = &loaded.path {
        tracing::debug!(path = %path.display(), "loaded settings");
    }

    let cwd = match cli.cwd {
        Some(cwd) => cwd,
        None => std::env::current_dir().context("failed to read current directory")?,
    };
    let ctx = Context {
        cwd,
        json: cli.json,
        config: loaded.config,
    };

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(commands::dispatch(cli.command, &ctx))
}

/// Install the `tracing` subscriber on stderr.
///
/// `--debug` wins; otherwise `GITDECK_LOG` is used, defaulting to `warn`.
fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
