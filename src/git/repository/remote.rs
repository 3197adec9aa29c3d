//! Fetch, pull, push and remote management.

use super::{ForcePushMode, Repository};
use crate::git::classify::{
    refine, refine_with, ClassifyContext, FETCH_RULES, PULL_RULES, PUSH_RULES,
};
use crate::git::error::GitResult;

/// Options for [`Repository::fetch`].
///
/// [`Repository::pull`] reuses the transfer flags (`prune`, `depth`, `tags`,
/// `unshallow`, `silent`); it picks the remote and branch itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub remote: Option<String>,
    /// Refspec fetched from `remote`.
    pub refspec: Option<String>,
    /// Fetch every remote; `remote` and `refspec` are ignored.
    pub all: bool,
    pub prune: bool,
    pub depth: Option<u32>,
    pub tags: bool,
    pub unshallow: bool,
    /// No progress output (`--quiet`), as for background fetches.
    pub silent: bool,
}

impl FetchOptions {
    fn transfer_args(&self, args: &mut Vec<String>) {
        if self.prune {
            args.push("--prune".into());
        }
        if let Some(depth) = self.depth {
            args.push(format!("--depth={depth}"));
        }
        if self.tags {
            args.push("--tags".into());
        }
        if self.unshallow {
            args.push("--unshallow".into());
        }
    }
}

/// Options for [`Repository::pull`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullOptions {
    pub rebase: bool,
    pub remote: Option<String>,
    pub branch: Option<String>,
    /// Transfer flags; `remote`, `refspec` and `all` are not used.
    pub fetch: FetchOptions,
}

/// Options for [`Repository::push`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushOptions {
    pub remote: Option<String>,
    /// Local name, or `local:remote` mapping.
    pub name: Option<String>,
    pub set_upstream: bool,
    pub follow_tags: bool,
    pub force: Option<ForcePushMode>,
    pub tags: bool,
}

impl Repository {
    pub async fn fetch(&self, opts: &FetchOptions) -> GitResult<()> {
        let mut args = vec!["fetch".to_string()];
        if opts.silent {
            args.push("--quiet".into());
        }
        if opts.all {
            args.push("--all".into());
        } else if let Some(remote) = &opts.remote {
            args.push(remote.clone());
            if let Some(refspec) = &opts.refspec {
                args.push(refspec.clone());
            }
        }
        opts.transfer_args(&mut args);
        self.exec(&args)
            .await
            .map(|_| ())
            .map_err(|e| refine(e, &FETCH_RULES))
    }

    pub async fn pull(&self, opts: &PullOptions) -> GitResult<()> {
        let mut args = vec!["pull".to_string()];
        if opts.fetch.silent {
            args.push("--quiet".into());
        }
        opts.fetch.transfer_args(&mut args);
        if opts.rebase {
            args.push("--rebase".into());
        }
        if let (Some(remote), Some(branch)) = (&opts.remote, &opts.branch) {
            args.push(remote.clone());
            args.push(branch.clone());
        }
        self.exec(&args)
            .await
            .map(|_| ())
            .map_err(|e| refine(e, &PULL_RULES))
    }

    /// Push, classifying lease rejections by the force mode actually used.
    ///
    /// `--force-if-includes` needs git 2.30; older versions push with a plain
    /// lease.
    pub async fn push(&self, opts: &PushOptions) -> GitResult<()> {
        let mut args = vec!["push".to_string()];
        let mut mode = opts.force;
        match opts.force {
            Some(ForcePushMode::ForceWithLease) => args.push("--force-with-lease".into()),
            Some(ForcePushMode::ForceWithLeaseIfIncludes) => {
                args.push("--force-with-lease".into());
                if self.runner.version().supports_force_if_includes() {
                    args.push("--force-if-includes".into());
                } else {
                    mode = Some(ForcePushMode::ForceWithLease);
                }
            }
            Some(ForcePushMode::Force) => args.push("--force".into()),
            None => {}
        }
        if opts.set_upstream {
            args.push("-u".into());
        }
        if opts.follow_tags {
            args.push("--follow-tags".into());
        }
        if opts.tags {
            args.push("--tags".into());
        }
        if let Some(remote) = &opts.remote {
            args.push(remote.clone());
        }
        if let Some(name) = &opts.name {
            args.push(name.clone());
        }

        let ctx = ClassifyContext {
            force_push_mode: mode,
        };
        self.exec(&args)
            .await
            .map(|_| ())
            .map_err(|e| refine_with(e, &PUSH_RULES, &ctx))
    }

    pub async fn add_remote(&self, name: &str, url: &str) -> GitResult<()> {
        self.exec(&["remote", "add", name, url]).await?;
        Ok(())
    }

    pub async fn remove_remote(&self, name: &str) -> GitResult<()> {
        self.exec(&["remote", "remove", name]).await?;
        Ok(())
    }

    pub async fn rename_remote(&self, name: &str, new_name: &str) -> GitResult<()> {
        self.exec(&["remote", "rename", name, new_name]).await?;
        Ok(())
    }
}
