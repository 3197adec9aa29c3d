//! status command - HEAD, in-progress operations and change buckets

use std::path::Path;

use anyhow::Result;

use super::{open_model, print_json, short_hash};
use crate::cli::Context;
use crate::core::types::Branch;
use crate::engine::{RepositorySnapshot, Resource};

/// Print the current snapshot.
pub async fn status(ctx: &Context) -> Result<()> {
    let model = open_model(ctx).await?;
    let snapshot = model.snapshot();
    if ctx.json {
        return print_json(&*snapshot);
    }
    print!("{}", render_status(&snapshot, model.root()));
    Ok(())
}

fn tracking(head: &Branch) -> String {
    let Some(upstream) = &head.upstream else {
        return String::new();
    };
    let mut counts = Vec::new();
    if let Some(ahead) = head.ahead.filter(|n| *n > 0) {
        counts.push(format!("ahead {ahead}"));
    }
    if let Some(behind) = head.behind.filter(|n| *n > 0) {
        counts.push(format!("behind {behind}"));
    }
    if counts.is_empty() {
        format!(" [{upstream}]")
    } else {
        format!(" [{upstream}: {}]", counts.join(", "))
    }
}

fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

fn render_resource(resource: &Resource, root: &Path) -> String {
    let path = display_path(&resource.path, root);
    match &resource.original_path {
        Some(original) => format!(
            "  {} {} <- {}\n",
            resource.status.letter(),
            path,
            display_path(original, root)
        ),
        None => format!("  {} {}\n", resource.status.letter(), path),
    }
}

/// Text rendering of a snapshot, paths relative to `root`.
pub fn render_status(snapshot: &RepositorySnapshot, root: &Path) -> String {
    let mut out = String::new();

    match &snapshot.head {
        Some(head) => match head.name() {
            Some(name) => out.push_str(&format!("On branch {name}{}\n", tracking(head))),
            None => out.push_str(&format!(
                "HEAD detached at {}\n",
                head.commit().map(short_hash).unwrap_or("(unknown)")
            )),
        },
        None => out.push_str("No commits yet\n"),
    }
    if snapshot.merge_in_progress {
        out.push_str("Merge in progress\n");
    }
    if snapshot.rebase_in_progress {
        out.push_str("Rebase in progress\n");
    }
    if snapshot.is_huge {
        out.push_str("Too many changes, list is truncated\n");
    }

    let groups = &snapshot.groups;
    if groups.is_empty() {
        out.push_str("\nNothing to commit, working tree clean\n");
        return out;
    }

    let sections = [
        ("Merge changes", &groups.merge),
        ("Staged changes", &groups.index),
        ("Changes", &groups.working_tree),
        ("Untracked files", &groups.untracked),
    ];
    for (title, resources) in sections {
        if resources.is_empty() {
            continue;
        }
        out.push_str(&format!("\n{title}:\n"));
        for resource in resources {
            out.push_str(&render_resource(resource, root));
        }
    }
    out
}
