//! Checkout, branches, tags and ref listings.

use std::path::PathBuf;

use tracing::debug;

use super::Repository;
use crate::core::types::{Branch, Ref, UpstreamRef};
use crate::git::classify::{refine, CHECKOUT_RULES};
use crate::git::error::{GitError, GitResult};
use crate::git::parse::{
    parse_branch_details, parse_left_right_count, parse_refs, BRANCH_FORMAT, REFS_FORMAT,
};

/// Flags for [`Repository::checkout`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckoutOptions {
    pub track: bool,
    pub detached: bool,
}

/// Ordering for [`Repository::get_refs`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefSort {
    #[default]
    Alphabetically,
    /// Most recently committed first.
    CommitterDate,
}

/// Filter for [`Repository::get_refs`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefQuery {
    /// Ref patterns; all heads, remotes and tags when empty.
    pub patterns: Vec<String>,
    pub sort: RefSort,
    pub count: Option<usize>,
}

impl Repository {
    /// Switch to `treeish`, or restore `paths` from it.
    pub async fn checkout(
        &self,
        treeish: &str,
        paths: &[PathBuf],
        opts: CheckoutOptions,
    ) -> GitResult<()> {
        let mut args = vec!["checkout".to_string(), "-q".to_string()];
        if opts.track {
            args.push("--track".into());
        }
        if opts.detached {
            args.push("--detach".into());
        }
        if !treeish.is_empty() {
            args.push(treeish.to_string());
        }

        let result = if paths.is_empty() {
            self.exec(&args).await.map(|_| ())
        } else {
            self.exec_batched(&args, &self.path_args(paths)).await
        };
        result.map_err(|e| refine(e, &CHECKOUT_RULES))
    }

    /// Create branch `name` at `base` (HEAD by default), optionally
    /// switching to it.
    pub async fn branch(&self, name: &str, checkout: bool, base: Option<&str>) -> GitResult<()> {
        let mut args: Vec<&str> = if checkout {
            vec!["checkout", "-q", "-b", name, "--no-track"]
        } else {
            vec!["branch", "-q", name]
        };
        if let Some(base) = base {
            args.push(base);
        }
        self.exec(&args).await?;
        Ok(())
    }

    pub async fn delete_branch(&self, name: &str, force: bool) -> GitResult<()> {
        let flag = if force { "-D" } else { "-d" };
        self.exec(&["branch", flag, name]).await?;
        Ok(())
    }

    /// Rename the current branch.
    pub async fn rename_branch(&self, name: &str) -> GitResult<()> {
        self.exec(&["branch", "-m", name]).await?;
        Ok(())
    }

    pub async fn set_branch_upstream(&self, name: &str, upstream: &str) -> GitResult<()> {
        self.exec(&["branch", "--set-upstream-to", upstream, name])
            .await?;
        Ok(())
    }

    /// Branch `name` with its upstream and ahead/behind counts.
    ///
    /// Uses `for-each-ref` tracking fields first. When those are unavailable
    /// the upstream is resolved with `rev-parse` and counted with
    /// `rev-list`.
    pub async fn get_branch(&self, name: &str) -> GitResult<Branch> {
        if name == "HEAD" {
            return Ok(Branch::from_ref(self.get_head().await?));
        }

        let format = format!("--format={BRANCH_FORMAT}");
        let heads = format!("refs/heads/{name}");
        let remotes = format!("refs/remotes/{name}");
        match self
            .exec(&["for-each-ref", format.as_str(), heads.as_str(), remotes.as_str()])
            .await
        {
            Ok(result) => {
                if let Some(branch) = parse_branch_details(&result.stdout) {
                    return Ok(branch);
                }
                debug!(name, "for-each-ref found no branch, resolving directly");
            }
            Err(err) => debug!(name, error = %err, "for-each-ref failed, resolving directly"),
        }

        self.get_branch_fallback(name).await
    }

    async fn get_branch_fallback(&self, name: &str) -> GitResult<Branch> {
        let commit = self.exec(&["rev-parse", name]).await?.stdout;
        if commit.is_empty() {
            return Err(GitError::other(format!("no such branch: {name}")));
        }
        let mut branch = Branch::from_ref(Ref::head(name, Some(commit)));

        let tracking = format!("{name}@{{u}}");
        let full_upstream = match self
            .exec(&["rev-parse", "--symbolic-full-name", tracking.as_str()])
            .await
        {
            Ok(result) => result.stdout,
            Err(err) => {
                debug!(name, error = %err, "branch has no upstream");
                return Ok(branch);
            }
        };
        let Some((remote, upstream_name)) = full_upstream
            .strip_prefix("refs/remotes/")
            .and_then(|rest| rest.split_once('/'))
        else {
            return Ok(branch);
        };
        branch.upstream = Some(UpstreamRef {
            remote: remote.to_string(),
            name: upstream_name.to_string(),
        });

        let range = format!("{name}...{full_upstream}");
        match self
            .exec(&["rev-list", "--left-right", "--count", range.as_str()])
            .await
        {
            Ok(result) => {
                if let Some((ahead, behind)) = parse_left_right_count(&result.stdout) {
                    branch.ahead = Some(ahead);
                    branch.behind = Some(behind);
                }
            }
            Err(err) => debug!(name, error = %err, "ahead/behind count failed"),
        }
        Ok(branch)
    }

    /// Heads, remote branches and tags.
    pub async fn get_refs(&self, query: &RefQuery) -> GitResult<Vec<Branch>> {
        let mut args = vec![
            "for-each-ref".to_string(),
            format!("--format={REFS_FORMAT}"),
        ];
        if query.sort == RefSort::CommitterDate {
            args.push("--sort=-committerdate".into());
        }
        if let Some(count) = query.count {
            args.push(format!("--count={count}"));
        }
        if query.patterns.is_empty() {
            args.extend(["refs/heads".into(), "refs/remotes".into(), "refs/tags".into()]);
        } else {
            args.extend(query.patterns.iter().cloned());
        }
        let result = self.exec(&args).await?;
        Ok(parse_refs(&result.stdout))
    }

    /// Lightweight tag, or annotated when `message` is given.
    pub async fn tag(&self, name: &str, message: Option<&str>, target: Option<&str>) -> GitResult<()> {
        let mut args: Vec<&str> = vec!["tag"];
        match message {
            Some(message) => args.extend(["-a", name, "-m", message]),
            None => args.push(name),
        }
        if let Some(target) = target {
            args.push(target);
        }
        self.exec(&args).await?;
        Ok(())
    }

    pub async fn delete_tag(&self, name: &str) -> GitResult<()> {
        self.exec(&["tag", "-d", name]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::core::types::RefType;
    use crate::git::error::GitErrorKind;
    use crate::git::mock::{MockResponse, MockSpawner};

    const A: &str = "1111111111111111111111111111111111111111";

    mod checkout {
        use super::*;

        #[tokio::test]
        async fn switches_branch() {
            let spawner = MockSpawner::new();
            repo(&spawner)
                .checkout("main", &[], CheckoutOptions::default())
                .await
                .unwrap();
            assert_eq!(spawner.calls()[0].args, vec!["checkout", "-q", "main"]);
        }

        #[tokio::test]
        async fn track_and_detach_flags() {
            let spawner = MockSpawner::new();
            repo(&spawner)
                .checkout(
                    "origin/x",
                    &[],
                    CheckoutOptions {
                        track: true,
                        detached: true,
                    },
                )
                .await
                .unwrap();
            assert!(spawner.calls()[0].matches(&["--track", "--detach", "origin/x"]));
        }

        #[tokio::test]
        async fn restores_paths() {
            let spawner = MockSpawner::new();
            repo(&spawner)
                .checkout("HEAD", &[PathBuf::from("/repo/a.txt")], CheckoutOptions::default())
                .await
                .unwrap();
            assert_eq!(
                spawner.calls()[0].args,
                vec!["checkout", "-q", "HEAD", "--", "a.txt"]
            );
        }

        #[tokio::test]
        async fn dirty_tree() {
            let spawner = MockSpawner::new();
            spawner.on(
                &["checkout"],
                MockResponse::fail("error: Your local changes to the following files would be overwritten by checkout:\n\ta.txt\nPlease commit your changes or stash them before you switch branches."),
            );
            let err = repo(&spawner)
                .checkout("other", &[], CheckoutOptions::default())
                .await
                .unwrap_err();
            assert!(err.is(GitErrorKind::DirtyWorkTree));
        }

        #[tokio::test]
        async fn unborn_branch() {
            let spawner = MockSpawner::new();
            spawner.on(
                &["checkout"],
                MockResponse::fail("fatal: You are on a branch yet to be born"),
            );
            let err = repo(&spawner)
                .checkout("x", &[], CheckoutOptions::default())
                .await
                .unwrap_err();
            assert!(err.is(GitErrorKind::BranchNotYetBorn));
        }
    }

    mod branches {
        use super::*;

        #[tokio::test]
        async fn create_and_checkout() {
            let spawner = MockSpawner::new();
            let repo = repo(&spawner);
            repo.branch("topic", true, Some("main")).await.unwrap();
            repo.branch("other", false, None).await.unwrap();
            let calls = spawner.calls();
            assert_eq!(
                calls[0].args,
                vec!["checkout", "-q", "-b", "topic", "--no-track", "main"]
            );
            assert_eq!(calls[1].args, vec!["branch", "-q", "other"]);
        }

        #[tokio::test]
        async fn existing_branch_is_classified_globally() {
            let spawner = MockSpawner::new();
            spawner.on(
                &["branch"],
                MockResponse::fail("fatal: A branch named 'topic' already exists."),
            );
            let err = repo(&spawner).branch("topic", false, None).await.unwrap_err();
            assert!(err.is(GitErrorKind::BranchAlreadyExists));
        }

        #[tokio::test]
        async fn delete_not_fully_merged() {
            let spawner = MockSpawner::new();
            spawner.on(
                &["branch", "-d"],
                MockResponse::fail("error: The branch 'topic' is not fully merged."),
            );
            let repo = repo(&spawner);
            let err = repo.delete_branch("topic", false).await.unwrap_err();
            assert!(err.is(GitErrorKind::BranchNotFullyMerged));
            repo.delete_branch("topic", true).await.unwrap();
            assert!(spawner.calls()[1].matches(&["branch", "-D", "topic"]));
        }

        #[tokio::test]
        async fn get_branch_from_tracking_fields() {
            let spawner = MockSpawner::new();
            spawner.on(
                &["for-each-ref"],
                MockResponse::ok(format!(
                    "refs/heads/main\0origin/main\0{A}\0[behind 2]\0origin\0refs/heads/main\n"
                )),
            );
            let branch = repo(&spawner).get_branch("main").await.unwrap();
            assert_eq!(branch.upstream.as_ref().map(|u| u.to_string()).as_deref(), Some("origin/main"));
            assert_eq!((branch.ahead, branch.behind), (Some(0), Some(2)));
            assert_eq!(spawner.call_count(), 1);
        }

        #[tokio::test]
        async fn get_branch_falls_back_to_counting() {
            let spawner = MockSpawner::new();
            spawner
                .on(&["for-each-ref"], MockResponse::fail("error: unknown field name: upstream:remoteref"))
                .on(&["rev-parse", "main"], MockResponse::ok(format!("{A}\n")))
                .on(&["--symbolic-full-name"], MockResponse::ok("refs/remotes/origin/main\n"))
                .on(&["rev-list"], MockResponse::ok("4\t1\n"));
            let branch = repo(&spawner).get_branch("main").await.unwrap();
            assert_eq!(branch.commit(), Some(A));
            assert_eq!(branch.upstream.unwrap().remote, "origin");
            assert_eq!((branch.ahead, branch.behind), (Some(4), Some(1)));
            assert!(spawner.calls()[3].matches(&["main...refs/remotes/origin/main"]));
        }

        #[tokio::test]
        async fn get_branch_without_upstream() {
            let spawner = MockSpawner::new();
            spawner
                .on(&["for-each-ref"], MockResponse::ok(""))
                .on(&["rev-parse", "topic"], MockResponse::ok(format!("{A}\n")))
                .on(&["--symbolic-full-name"], MockResponse::fail("fatal: no upstream configured"));
            let branch = repo(&spawner).get_branch("topic").await.unwrap();
            assert!(branch.upstream.is_none());
            assert_eq!(branch.ahead, None);
        }
    }

    mod refs {
        use super::*;

        #[tokio::test]
        async fn default_patterns_and_sort() {
            let spawner = MockSpawner::new();
            spawner.on(
                &["for-each-ref"],
                MockResponse::ok(format!("refs/heads/main\0{A}\0\0\0Init\nrefs/tags/v1\0{A}\0\0\0Init\n")),
            );
            let refs = repo(&spawner)
                .get_refs(&RefQuery {
                    sort: RefSort::CommitterDate,
                    count: Some(5),
                    ..Default::default()
                })
                .await
                .unwrap();
            assert_eq!(refs.len(), 2);
            assert_eq!(refs[1].reference.ref_type, RefType::Tag);
            let call = &spawner.calls()[0];
            assert!(call.matches(&["--sort=-committerdate", "--count=5", "refs/heads", "refs/remotes", "refs/tags"]));
        }

        #[tokio::test]
        async fn annotated_and_lightweight_tags() {
            let spawner = MockSpawner::new();
            let repo = repo(&spawner);
            repo.tag("v1", Some("Release"), Some("abc")).await.unwrap();
            repo.tag("v2", None, None).await.unwrap();
            repo.delete_tag("v2").await.unwrap();
            let calls = spawner.calls();
            assert_eq!(calls[0].args, vec!["tag", "-a", "v1", "-m", "Release", "abc"]);
            assert_eq!(calls[1].args, vec!["tag", "v2"]);
            assert_eq!(calls[2].args, vec!["tag", "-d", "v2"]);
        }
    }
}
