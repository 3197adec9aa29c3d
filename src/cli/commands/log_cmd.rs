//! log command - recent commits

use anyhow::Result;

use super::{open_model, print_json, short_hash};
use crate::cli::Context;
use crate::core::types::Commit;
use crate::git::repository::LogOptions;

pub async fn log(ctx: &Context, max_count: usize, range: Option<String>) -> Result<()> {
    let model = open_model(ctx).await?;
    let commits = model
        .log(LogOptions {
            max_entries: max_count,
            range,
            ..Default::default()
        })
        .await?;
    if ctx.json {
        return print_json(&commits);
    }
    print!("{}", render_commits(&commits));
    Ok(())
}

/// One line per commit: hash, date, author, decorations and subject.
pub fn render_commits(commits: &[Commit]) -> String {
    let mut out = String::new();
    for commit in commits {
        let date = commit
            .author_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let author = commit.author_name.as_deref().unwrap_or("");
        let refs = if commit.ref_names.is_empty() {
            String::new()
        } else {
            format!(" ({})", commit.ref_names.join(", "))
        };
        out.push_str(&format!(
            "{} {date} {author}{refs} {}\n",
            short_hash(&commit.hash),
            commit.subject()
        ));
    }
    out
}
