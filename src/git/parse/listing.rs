//! git::parse::listing
//!
//! Parsers for the smaller listings: `remote --verbose`, `stash list` and
//! `worktree list --porcelain -z`.

use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::DateTime;
use regex::Regex;

use crate::core::types::{Remote, Stash, Worktree};

/// `stash list` format understood by [`parse_stashes`].
pub const STASH_FORMAT: &str = "%gd%x00%ct%x00%gs";

static REMOTE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^\s]+)\s+([^\s]+)\s+\((fetch|push)\)").expect("static remote pattern")
});
static STASH_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^stash@\{(\d+)\}$").expect("static stash pattern"));
static STASH_SUBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:WIP on|On) ([^:]+): (.*)$").expect("static stash subject pattern")
});

/// Parse `git remote --verbose`, keeping first-seen order.
pub fn parse_remote_verbose(output: &str) -> Vec<Remote> {
    let mut remotes: Vec<Remote> = Vec::new();
    for caps in output.lines().filter_map(|l| REMOTE_LINE.captures(l)) {
        let name = &caps[1];
        let url = caps[2].to_string();
        let idx = match remotes.iter().position(|r| r.name == name) {
            Some(idx) => idx,
            None => {
                remotes.push(Remote {
                    name: name.to_string(),
                    fetch_url: None,
                    push_url: None,
                    is_read_only: false,
                });
                remotes.len() - 1
            }
        };
        let remote = &mut remotes[idx];
        if &caps[3] == "fetch" {
            remote.fetch_url = Some(url);
        } else {
            remote.is_read_only = url == "DISABLE" || url == "no_push";
            remote.push_url = Some(url);
        }
    }
    remotes
}

/// Parse `git stash list --format=STASH_FORMAT`.
pub fn parse_stashes(output: &str) -> Vec<Stash> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.splitn(3, '\0');
            let reflog = fields.next()?;
            let index = STASH_REF.captures(reflog)?[1].parse().ok()?;
            let commit_date = fields
                .next()
                .and_then(|s| s.parse().ok())
                .and_then(|secs| DateTime::from_timestamp(secs, 0));
            let subject = fields.next().unwrap_or("");

            let (branch_name, description) = match STASH_SUBJECT.captures(subject) {
                Some(caps) => (Some(caps[1].to_string()), caps[2].to_string()),
                None => (None, subject.to_string()),
            };
            Some(Stash {
                index,
                description,
                branch_name,
                commit_date,
            })
        })
        .collect()
}

/// Parse `git worktree list --porcelain -z`.
///
/// Records are runs of fields separated by an empty field. The first record
/// is the main working tree. Bare entries are skipped.
pub fn parse_worktrees(output: &str) -> Vec<Worktree> {
    let mut worktrees = Vec::new();
    let mut first = true;

    for record in output.split("\0\0") {
        let mut path = None;
        let mut commit = None;
        let mut reference = None;
        let mut detached = false;
        let mut bare = false;

        for field in record.split('\0').filter(|f| !f.is_empty()) {
            let (key, value) = field.split_once(' ').unwrap_or((field, ""));
            match key {
                "worktree" => path = Some(PathBuf::from(value)),
                "HEAD" => commit = Some(value.to_string()),
                "branch" => reference = Some(value.to_string()),
                "detached" => detached = true,
                "bare" => bare = true,
                _ => {}
            }
        }

        let Some(path) = path else { continue };
        let is_main = first;
        first = false;
        if bare {
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        worktrees.push(Worktree {
            name,
            path,
            reference,
            commit,
            detached,
            is_main,
        });
    }
    worktrees
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_verbose() {
        let output = "origin\tgit@example.com:a.git (fetch)\norigin\tgit@example.com:a.git (push)\nro\thttps://example.com/b (fetch)\nro\tno_push (push)\n";
        let remotes = parse_remote_verbose(output);
        assert_eq!(remotes.len(), 2);
        assert_eq!(remotes[0].fetch_url.as_deref(), Some("git@example.com:a.git"));
        assert!(!remotes[0].is_read_only);
        assert_eq!(remotes[1].name, "ro");
        assert!(remotes[1].is_read_only);
    }

    #[test]
    fn stashes() {
        let output = "stash@{0}\x001700000000\x00WIP on main: abc123 Fix thing\nstash@{1}\x001690000000\x00On feature/x: saved work\nstash@{2}\x00\x00custom\n";
        let stashes = parse_stashes(output);
        assert_eq!(stashes.len(), 3);
        assert_eq!(stashes[0].index, 0);
        assert_eq!(stashes[0].branch_name.as_deref(), Some("main"));
        assert_eq!(stashes[0].description, "abc123 Fix thing");
        assert_eq!(stashes[0].commit_date.map(|d| d.timestamp()), Some(1_700_000_000));
        assert_eq!(stashes[1].branch_name.as_deref(), Some("feature/x"));
        assert_eq!(stashes[1].description, "saved work");
        assert_eq!(stashes[2].branch_name, None);
        assert_eq!(stashes[2].commit_date, None);
    }

    #[test]
    fn worktrees() {
        let output = "worktree /repo\0HEAD aaaa\0branch refs/heads/main\0\0worktree /wt/feature\0HEAD bbbb\0detached\0\0";
        let trees = parse_worktrees(output);
        assert_eq!(trees.len(), 2);
        assert!(trees[0].is_main);
        assert_eq!(trees[0].reference.as_deref(), Some("refs/heads/main"));
        assert_eq!(trees[1].name, "feature");
        assert!(trees[1].detached);
        assert!(!trees[1].is_main);
    }

    #[test]
    fn bare_main_is_skipped() {
        let output = "worktree /srv/repo.git\0bare\0\0worktree /wt/a\0HEAD cccc\0branch refs/heads/a\0\0";
        let trees = parse_worktrees(output);
        assert_eq!(trees.len(), 1);
        assert!(!trees[0].is_main);
    }
}
