//! git::parse::log
//!
//! Parser for `git log -z` with [`COMMIT_FORMAT`].
//!
//! Each record is eight newline-separated fields ending in NUL: hash, author
//! name, author email, author epoch, commit epoch, parents, decorations and
//! the raw message. With `--shortstat` a summary line follows the NUL.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::warn;

use crate::core::types::{Commit, CommitShortStat};

/// Pretty format understood by [`parse_commits`].
pub const COMMIT_FORMAT: &str = "%H%n%aN%n%aE%n%at%n%ct%n%P%n%D%n%B";

static HASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{40,64}$").expect("static hash pattern"));

static SHORTSTAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+) files? changed(?:, (\d+) insertions?\(\+\))?(?:, (\d+) deletions?\(-\))?")
        .expect("static shortstat pattern")
});

/// Parse a `--shortstat` summary line.
pub fn parse_short_stat(line: &str) -> Option<CommitShortStat> {
    let caps = SHORTSTAT.captures(line)?;
    let num = |i: usize| {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    Some(CommitShortStat {
        files: num(1),
        insertions: num(2),
        deletions: num(3),
    })
}

fn epoch(field: &str) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(field.trim().parse().ok()?, 0)
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn parse_record(record: &str) -> Option<Commit> {
    let mut fields = record.splitn(8, '\n');
    let hash = fields.next()?.trim();
    if !HASH.is_match(hash) {
        return None;
    }
    let author_name = fields.next()?;
    let author_email = fields.next()?;
    let author_date = fields.next()?;
    let commit_date = fields.next()?;
    let parents = fields.next()?;
    let ref_names = fields.next()?;
    let raw_message = fields.next().unwrap_or("");

    let message = raw_message.strip_suffix('\n').unwrap_or(raw_message);

    Some(Commit {
        hash: hash.to_string(),
        message: message.to_string(),
        parents: parents.split_whitespace().map(str::to_string).collect(),
        author_name: non_empty(author_name),
        author_email: non_empty(author_email),
        author_date: epoch(author_date),
        commit_date: epoch(commit_date),
        ref_names: ref_names
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        short_stat: None,
    })
}

/// Parse `git log -z --format=COMMIT_FORMAT [--shortstat]` output.
///
/// Records that do not start with an object id are skipped.
pub fn parse_commits(output: &str) -> Vec<Commit> {
    let mut commits = Vec::new();
    let mut rest = output;

    loop {
        rest = rest.trim_start_matches('\n');
        if rest.is_empty() {
            break;
        }

        let (record, after) = match rest.find('\0') {
            Some(end) => (&rest[..end], &rest[end + 1..]),
            None => (rest, ""),
        };
        rest = after;

        let mut short_stat = None;
        if let Some(stripped) = rest.strip_prefix('\n') {
            let end = stripped.find('\n').unwrap_or(stripped.len());
            let line = &stripped[..end];
            if let Some(stat) = parse_short_stat(line) {
                short_stat = Some(stat);
                rest = &stripped[end..];
            }
        }

        match parse_record(record) {
            Some(mut commit) => {
                commit.short_stat = short_stat;
                commits.push(commit);
            }
            None => warn!(record = %record.lines().next().unwrap_or(""), "unparseable commit record"),
        }
    }
    commits
}

#[cfg(test)]
mod tests {
    use super::*;

    const H1: &str = "52c293a05038d865604c2284aa8698bd087915a1";
    const H2: &str = "8e5a374372b8393906c7e380dbb09349c5385554";

    fn record(hash: &str, parents: &str, refs: &str, message: &str) -> String {
        format!("{hash}\nJane Doe\njane@example.com\n1700000000\n1700000100\n{parents}\n{refs}\n{message}\0")
    }

    #[test]
    fn single_commit_fields() {
        let output = record(H1, H2, "HEAD -> main, origin/main", "Subject\n");
        let commits = parse_commits(&output);
        assert_eq!(commits.len(), 1);

        let c = &commits[0];
        assert_eq!(c.hash, H1);
        assert_eq!(c.author_name.as_deref(), Some("Jane Doe"));
        assert_eq!(c.author_email.as_deref(), Some("jane@example.com"));
        assert_eq!(c.author_date.map(|d| d.timestamp()), Some(1_700_000_000));
        assert_eq!(c.commit_date.map(|d| d.timestamp()), Some(1_700_000_100));
        assert_eq!(c.parents, vec![H2.to_string()]);
        assert_eq!(c.ref_names, vec!["HEAD -> main", "origin/main"]);
        assert_eq!(c.message, "Subject");
    }

    #[test]
    fn only_one_trailing_newline_is_stripped() {
        let output = record(H1, "", "", "Subject\n\nBody\nmore\n\n");
        let commits = parse_commits(&output);
        assert_eq!(commits[0].message, "Subject\n\nBody\nmore\n");
    }

    #[test]
    fn embedded_newlines_are_preserved() {
        let output = record(H1, "", "", "a\n\n  b\nc");
        assert_eq!(parse_commits(&output)[0].message, "a\n\n  b\nc");
    }

    #[test]
    fn multiple_records_and_merge_parents() {
        let output = format!(
            "{}\n{}",
            record(H1, &format!("{H2} {H2}"), "", "Merge\n"),
            record(H2, "", "tag: v1", "Root\n")
        );
        let commits = parse_commits(&output);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].parents.len(), 2);
        assert!(commits[1].parents.is_empty());
        assert_eq!(commits[1].ref_names, vec!["tag: v1"]);
    }

    #[test]
    fn shortstat_follows_record() {
        let output = format!(
            "{}\n 3 files changed, 10 insertions(+), 2 deletions(-)\n{}\n 1 file changed, 1 deletion(-)\n",
            record(H1, "", "", "One\n"),
            record(H2, "", "", "Two\n")
        );
        let commits = parse_commits(&output);
        assert_eq!(
            commits[0].short_stat,
            Some(CommitShortStat {
                files: 3,
                insertions: 10,
                deletions: 2
            })
        );
        assert_eq!(
            commits[1].short_stat,
            Some(CommitShortStat {
                files: 1,
                insertions: 0,
                deletions: 1
            })
        );
    }

    #[test]
    fn garbage_is_skipped() {
        let output = format!("not a commit\0{}", record(H2, "", "", "ok"));
        let commits = parse_commits(&output);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].hash, H2);
    }
}
