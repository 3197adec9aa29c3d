//! Integration tests against a real git executable.
//!
//! These tests create repositories in temporary directories and drive them
//! through the repository model. Enable with `--features system_git_tests`.

#![cfg(feature = "system_git_tests")]

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use gitdeck::core::config::EngineConfig;
use gitdeck::engine::{Collaborators, EngineError, RepositoryModel, Status};
use gitdeck::git::repository::{CommitOptions, RefQuery};
use gitdeck::git::GitErrorKind;

/// Test fixture that creates a real git repository with one commit.
struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        run_git(dir.path(), &["init", "-q", "-b", "main"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["config", "user.name", "Test User"]);
        run_git(dir.path(), &["config", "commit.gpgsign", "false"]);

        std::fs::write(dir.path().join("README.md"), "# Test Repo\n").unwrap();
        run_git(dir.path(), &["add", "README.md"]);
        run_git(dir.path(), &["commit", "-q", "-m", "Initial commit"]);
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, name: &str, contents: &str) {
        std::fs::write(self.path().join(name), contents).unwrap();
    }

    async fn open(&self) -> RepositoryModel {
        RepositoryModel::open(self.path(), Collaborators::system(), EngineConfig::default())
            .await
            .expect("failed to open test repo")
    }
}

/// Run a git command in the given directory.
fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

fn file_names(resources: &[gitdeck::engine::Resource]) -> Vec<String> {
    resources
        .iter()
        .filter_map(|r| r.path.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect()
}

// =============================================================================
// Opening
// =============================================================================

#[tokio::test]
async fn open_from_subdirectory() {
    let repo = TestRepo::new();
    let subdir = repo.path().join("subdir");
    std::fs::create_dir(&subdir).unwrap();

    let model = RepositoryModel::open(&subdir, Collaborators::system(), EngineConfig::default())
        .await
        .unwrap();
    assert_eq!(
        model.root().canonicalize().unwrap(),
        repo.path().canonicalize().unwrap()
    );
    assert_eq!(
        model.snapshot().head.as_ref().and_then(|h| h.name()),
        Some("main")
    );
}

#[tokio::test]
async fn open_non_repository_fails() {
    let dir = TempDir::new().unwrap();
    let err = RepositoryModel::open(dir.path(), Collaborators::system(), EngineConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Git(ref e) if e.is(GitErrorKind::NotAGitRepository)));
}

// =============================================================================
// Working tree round trip
// =============================================================================

#[tokio::test]
async fn stage_commit_and_log() {
    let repo = TestRepo::new();
    repo.write("README.md", "# Changed\n");
    repo.write("notes.txt", "new\n");
    let model = repo.open().await;

    let snapshot = model.snapshot();
    assert_eq!(file_names(&snapshot.groups.working_tree), ["README.md", "notes.txt"]);
    assert_eq!(snapshot.groups.working_tree[0].status, Status::Modified);
    assert_eq!(snapshot.groups.working_tree[1].status, Status::Untracked);

    let paths: Vec<_> = snapshot.groups.working_tree.iter().map(|r| r.path.clone()).collect();
    model.stage(&paths).await.unwrap();
    assert_eq!(file_names(&model.snapshot().groups.index), ["README.md", "notes.txt"]);

    model
        .commit(Some("Second commit"), CommitOptions::default())
        .await
        .unwrap();
    assert!(model.snapshot().groups.is_empty());

    let head = model.get_commit("HEAD").await.unwrap();
    assert_eq!(head.subject(), "Second commit");
    assert_eq!(head.parents.len(), 1);
}

#[tokio::test]
async fn branches_and_tags_are_listed() {
    let repo = TestRepo::new();
    run_git(repo.path(), &["branch", "topic"]);
    run_git(repo.path(), &["tag", "v1"]);
    let model = repo.open().await;

    let refs = model.get_refs(RefQuery::default()).await.unwrap();
    let names: Vec<_> = refs.iter().filter_map(|r| r.name()).collect();
    assert!(names.contains(&"main"));
    assert!(names.contains(&"topic"));
    assert!(names.contains(&"v1"));
}

#[tokio::test]
async fn stash_round_trip() {
    let repo = TestRepo::new();
    repo.write("README.md", "# Stashed\n");
    let model = repo.open().await;

    model.stash(Some("wip"), false, false).await.unwrap();
    assert!(model.snapshot().groups.is_empty());
    let stashes = model.get_stashes().await.unwrap();
    assert_eq!(stashes.len(), 1);
    assert!(stashes[0].description.contains("wip"));

    model.pop_stash(None).await.unwrap();
    assert_eq!(file_names(&model.snapshot().groups.working_tree), ["README.md"]);
}

#[tokio::test]
async fn sync_without_upstream_fails() {
    let repo = TestRepo::new();
    let model = repo.open().await;
    let err = model.sync(false).await.unwrap_err();
    assert_eq!(err.git_kind(), Some(GitErrorKind::NoUpstreamBranch));
}
