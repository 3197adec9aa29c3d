//! version command - gitdeck and git versions

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use super::print_json;
use crate::cli::Context;
use crate::git::{GitRunner, TokioSpawner};

#[derive(Debug, Serialize)]
struct Versions {
    gitdeck: &'static str,
    git: String,
    git_path: String,
}

/// Print versions. Works outside a repository.
pub async fn version(ctx: &Context) -> Result<()> {
    let runner = GitRunner::detect(Arc::new(TokioSpawner), &ctx.config).await;
    let versions = Versions {
        gitdeck: env!("CARGO_PKG_VERSION"),
        git: runner.version().to_string(),
        git_path: runner.git_path().display().to_string(),
    };
    if ctx.json {
        return print_json(&versions);
    }
    println!("gitdeck {}", versions.gitdeck);
    println!("git {} ({})", versions.git, versions.git_path);
    Ok(())
}
