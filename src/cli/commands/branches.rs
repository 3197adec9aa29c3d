//! branches command - heads, remote branches and tags

use anyhow::Result;

use super::{open_model, print_json, short_hash};
use crate::cli::Context;
use crate::core::types::{Branch, RefType};
use crate::git::repository::RefQuery;

pub async fn branches(ctx: &Context) -> Result<()> {
    let model = open_model(ctx).await?;
    let refs = model.get_refs(RefQuery::default()).await?;
    if ctx.json {
        return print_json(&refs);
    }
    let snapshot = model.snapshot();
    let current = snapshot.head.as_ref().and_then(|h| h.name());
    print!("{}", render_refs(&refs, current));
    Ok(())
}

/// Refs grouped by kind; the current branch is starred.
pub fn render_refs(refs: &[Branch], current: Option<&str>) -> String {
    let width = refs
        .iter()
        .filter_map(|r| r.name())
        .map(str::len)
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for (title, kind) in [
        ("Branches", RefType::Head),
        ("Remote branches", RefType::RemoteHead),
        ("Tags", RefType::Tag),
    ] {
        let group: Vec<_> = refs.iter().filter(|r| r.reference.ref_type == kind).collect();
        if group.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("{title}:\n"));
        for branch in group {
            let name = branch.name().unwrap_or("");
            let marker = if kind == RefType::Head && Some(name) == current {
                '*'
            } else {
                ' '
            };
            let commit = branch.commit().map(short_hash).unwrap_or("");
            let summary = branch.reference.commit_summary.as_deref().unwrap_or("");
            let line = format!("{marker} {name:<width$} {commit} {summary}");
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }
    out
}
