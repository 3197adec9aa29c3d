//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Opens the repository model (except `version`)
//! 2. Reads through the model
//! 3. Renders text or JSON
//!
//! Rendering is kept in pure `render_*` functions so it can be tested
//! without a repository.

mod branches;
mod log_cmd;
mod remotes;
mod status;
mod version;

pub use branches::branches;
pub use log_cmd::log;
pub use remotes::remotes;
pub use status::status;
pub use version::version;

use anyhow::{Context as _, Result};
use serde::Serialize;

use super::{Command, Context};
use crate::engine::{Collaborators, RepositoryModel};

/// Dispatch a parsed command to its handler.
pub async fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Status => status(ctx).await,
        Command::Log { max_count, range } => log(ctx, max_count, range).await,
        Command::Branches => branches(ctx).await,
        Command::Remotes => remotes(ctx).await,
        Command::Version => version(ctx).await,
    }
}

/// Open the repository containing the working directory.
async fn open_model(ctx: &Context) -> Result<RepositoryModel> {
    RepositoryModel::open(&ctx.cwd, Collaborators::system(), ctx.config.clone())
        .await
        .with_context(|| format!("failed to open repository at {}", ctx.cwd.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// First seven characters of an object id.
fn short_hash(hash: &str) -> &str {
    hash.get(..7).unwrap_or(hash)
}
