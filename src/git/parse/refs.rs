//! git::parse::refs
//!
//! Parsers for `for-each-ref` output and upstream tracking syntax.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::core::types::{Branch, Ref, RefType, UpstreamRef};

/// `for-each-ref` format understood by [`parse_refs`].
pub const REFS_FORMAT: &str =
    "%(refname)%00%(objectname)%00%(*objectname)%00%(upstream:track)%00%(contents:subject)";

/// `for-each-ref` format understood by [`parse_branch_details`].
pub const BRANCH_FORMAT: &str = "%(refname)%00%(upstream:short)%00%(objectname)%00%(upstream:track)%00%(upstream:remotename)%00%(upstream:remoteref)";

static AHEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ahead (\d+)").expect("static ahead pattern"));
static BEHIND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"behind (\d+)").expect("static behind pattern"));

/// Ahead/behind counts from `%(upstream:track)`.
///
/// `[ahead 3, behind 1]` is `(3, 1)`, a missing side is zero, and `[]` is
/// `(0, 0)`. `[gone]` and empty input have no counts.
pub fn parse_ahead_behind(track: &str) -> (Option<u32>, Option<u32>) {
    let track = track.trim();
    if track.is_empty() || track == "[gone]" {
        return (None, None);
    }
    if !(track.starts_with('[') && track.ends_with(']')) {
        return (None, None);
    }
    let count = |re: &Regex| {
        re.captures(track)
            .and_then(|c| c[1].parse::<u32>().ok())
            .unwrap_or(0)
    };
    (Some(count(&AHEAD)), Some(count(&BEHIND)))
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Classify one ref name into its type, short name and remote.
fn classify_ref(refname: &str) -> Option<(RefType, String, Option<String>)> {
    if let Some(name) = refname.strip_prefix("refs/heads/") {
        return Some((RefType::Head, name.to_string(), None));
    }
    if let Some(rest) = refname.strip_prefix("refs/remotes/") {
        let (remote, _) = rest.split_once('/')?;
        return Some((RefType::RemoteHead, rest.to_string(), Some(remote.to_string())));
    }
    if let Some(name) = refname.strip_prefix("refs/tags/") {
        return Some((RefType::Tag, name.to_string(), None));
    }
    None
}

/// Parse [`REFS_FORMAT`] output into branches.
///
/// Heads carry ahead/behind counts from their tracking field. Tags point at
/// the peeled object when one is present. Unknown prefixes and malformed
/// lines are skipped.
pub fn parse_refs(output: &str) -> Vec<Branch> {
    let mut refs = Vec::new();
    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        let fields: Vec<&str> = line.split('\0').collect();
        if fields.len() < 2 {
            warn!(line, "malformed ref line");
            continue;
        }
        let Some((ref_type, name, remote)) = classify_ref(fields[0]) else {
            continue;
        };
        let object = fields[1];
        let peeled = fields.get(2).copied().unwrap_or("");
        let commit = if ref_type == RefType::Tag && !peeled.is_empty() {
            peeled
        } else {
            object
        };

        let mut branch = Branch::from_ref(Ref {
            ref_type,
            name: Some(name),
            commit: non_empty(commit),
            remote,
            commit_summary: fields.get(4).and_then(|s| non_empty(s)),
        });
        if ref_type == RefType::Head {
            let (ahead, behind) = parse_ahead_behind(fields.get(3).copied().unwrap_or(""));
            branch.ahead = ahead;
            branch.behind = behind;
        }
        refs.push(branch);
    }
    refs
}

/// Parse one line of [`BRANCH_FORMAT`] output.
///
/// The upstream is dropped when it is gone. A tracked branch with an empty
/// track field is in sync.
pub fn parse_branch_details(output: &str) -> Option<Branch> {
    let line = output.lines().find(|l| !l.trim().is_empty())?;
    let fields: Vec<&str> = line.split('\0').collect();
    let field = |i: usize| fields.get(i).copied().unwrap_or("");

    let (ref_type, name, remote) = classify_ref(field(0))?;
    let upstream_short = field(1);
    let track = field(3);
    let remote_name = field(4);
    let remote_ref = field(5);

    let mut branch = Branch::from_ref(Ref {
        ref_type,
        name: Some(name),
        commit: non_empty(field(2)),
        remote,
        commit_summary: None,
    });

    if !upstream_short.is_empty() && track.trim() != "[gone]" {
        let upstream_name = remote_ref
            .strip_prefix("refs/heads/")
            .unwrap_or(remote_ref)
            .to_string();
        if !remote_name.is_empty() && !upstream_name.is_empty() {
            branch.upstream = Some(UpstreamRef {
                remote: remote_name.to_string(),
                name: upstream_name,
            });
        }
        let (ahead, behind) = parse_ahead_behind(track);
        branch.ahead = Some(ahead.unwrap_or(0));
        branch.behind = Some(behind.unwrap_or(0));
    }
    Some(branch)
}

/// Parse `rev-list --left-right --count` output (`ahead\tbehind`).
pub fn parse_left_right_count(output: &str) -> Option<(u32, u32)> {
    let mut parts = output.split_whitespace();
    let ahead = parts.next()?.parse().ok()?;
    let behind = parts.next()?.parse().ok()?;
    Some((ahead, behind))
}

/// Split a short upstream name (`origin/feature/x`) into remote and branch.
pub fn parse_upstream_short(short: &str) -> Option<UpstreamRef> {
    let (remote, name) = short.trim().split_once('/')?;
    if remote.is_empty() || name.is_empty() {
        return None;
    }
    Some(UpstreamRef {
        remote: remote.to_string(),
        name: name.to_string(),
    })
}
