//! Stash family.

use super::Repository;
use crate::core::types::Stash;
use crate::git::classify::{refine, STASH_APPLY_RULES, STASH_PUSH_RULES};
use crate::git::error::GitResult;
use crate::git::parse::{parse_stashes, STASH_FORMAT};

fn stash_ref(index: usize) -> String {
    format!("stash@{{{index}}}")
}

impl Repository {
    /// `git stash push`.
    pub async fn stash(
        &self,
        message: Option<&str>,
        include_untracked: bool,
        staged: bool,
    ) -> GitResult<()> {
        let mut args = vec!["stash".to_string(), "push".to_string()];
        if include_untracked {
            args.push("-u".into());
        }
        if staged {
            args.push("--staged".into());
        }
        if let Some(message) = message.filter(|m| !m.is_empty()) {
            args.push("-m".into());
            args.push(message.to_string());
        }
        self.exec(&args)
            .await
            .map(|_| ())
            .map_err(|e| refine(e, &STASH_PUSH_RULES))
    }

    /// Apply and drop a stash, restoring the index too.
    pub async fn pop_stash(&self, index: Option<usize>) -> GitResult<()> {
        self.apply_stash_with("pop", index).await
    }

    /// Apply a stash, restoring the index too.
    pub async fn apply_stash(&self, index: Option<usize>) -> GitResult<()> {
        self.apply_stash_with("apply", index).await
    }

    async fn apply_stash_with(&self, verb: &str, index: Option<usize>) -> GitResult<()> {
        let mut args = vec!["stash".to_string(), verb.to_string(), "--index".to_string()];
        if let Some(index) = index {
            args.push(stash_ref(index));
        }
        self.exec(&args)
            .await
            .map(|_| ())
            .map_err(|e| refine(e, &STASH_APPLY_RULES))
    }

    /// Drop one stash, or clear them all when `index` is `None`.
    pub async fn drop_stash(&self, index: Option<usize>) -> GitResult<()> {
        let args = match index {
            Some(index) => vec!["stash".to_string(), "drop".to_string(), stash_ref(index)],
            None => vec!["stash".to_string(), "clear".to_string()],
        };
        self.exec(&args)
            .await
            .map(|_| ())
            .map_err(|e| refine(e, &STASH_APPLY_RULES))
    }

    pub async fn get_stashes(&self) -> GitResult<Vec<Stash>> {
        let format = format!("--format={STASH_FORMAT}");
        let result = self.exec(&["stash", "list", format.as_str()]).await?;
        Ok(parse_stashes(&result.stdout))
    }
}
