//! remotes command - configured remotes

use anyhow::Result;

use super::{open_model, print_json};
use crate::cli::Context;
use crate::core::types::Remote;

pub async fn remotes(ctx: &Context) -> Result<()> {
    let model = open_model(ctx).await?;
    let snapshot = model.snapshot();
    if ctx.json {
        return print_json(&snapshot.remotes);
    }
    print!("{}", render_remotes(&snapshot.remotes));
    Ok(())
}

/// `git remote -v` layout, flagging read-only remotes.
pub fn render_remotes(remotes: &[Remote]) -> String {
    let mut out = String::new();
    for remote in remotes {
        if let Some(url) = &remote.fetch_url {
            out.push_str(&format!("{}\t{url} (fetch)\n", remote.name));
        }
        match &remote.push_url {
            Some(url) if !remote.is_read_only => {
                out.push_str(&format!("{}\t{url} (push)\n", remote.name));
            }
            _ => out.push_str(&format!("{}\t(read-only)\n", remote.name)),
        }
    }
    out
}
