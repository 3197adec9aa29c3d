//! Integration tests for the repository model through the public API.
//!
//! These tests script git through `MockSpawner` and keep `.git` files in a
//! `MemoryFileSystem`, so no real git is needed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gitdeck::core::config::{EngineConfig, UntrackedPolicy};
use gitdeck::engine::{
    Collaborators, EngineError, OperationEvent, OperationKind, RepositoryModel, RepositoryState,
    Status,
};
use gitdeck::git::mock::{MemoryFileSystem, MockResponse, MockSpawner};
use gitdeck::git::repository::CommitOptions;
use gitdeck::git::GitErrorKind;

// =============================================================================
// Test Fixtures
// =============================================================================

/// A scripted repository rooted at `/repo` on `main`.
struct Fixture {
    spawner: MockSpawner,
    fs: MemoryFileSystem,
}

impl Fixture {
    fn new() -> Self {
        let spawner = MockSpawner::new();
        spawner.on(&["--version"], MockResponse::ok("git version 2.43.0\n"));
        spawner.on(&["rev-parse", "--show-toplevel"], MockResponse::ok("/repo\n"));
        spawner.on(&["rev-parse", "--git-dir"], MockResponse::ok(".git\n.git\n"));
        let fs = MemoryFileSystem::new();
        fs.write("/repo/.git/HEAD", "ref: refs/heads/main\n");
        Self { spawner, fs }
    }

    fn collaborators(&self) -> Collaborators {
        Collaborators {
            spawner: Arc::new(self.spawner.clone()),
            fs: Arc::new(self.fs.clone()),
        }
    }

    async fn open(&self, config: EngineConfig) -> RepositoryModel {
        RepositoryModel::open(Path::new("/repo"), self.collaborators(), config)
            .await
            .expect("open scripted repository")
    }
}

// =============================================================================
// Opening
// =============================================================================

#[tokio::test]
async fn open_publishes_initial_snapshot() {
    let fx = Fixture::new();
    fx.spawner.on(
        &["status", "-z"],
        MockResponse::ok("A  added.rs\0 D gone.rs\0?? scratch.txt\0"),
    );
    let model = fx
        .open(EngineConfig {
            untracked_changes: UntrackedPolicy::Separate,
            ..Default::default()
        })
        .await;

    let snapshot = model.snapshot();
    assert_eq!(snapshot.head.as_ref().and_then(|h| h.name()), Some("main"));
    assert_eq!(snapshot.groups.index.len(), 1);
    assert_eq!(snapshot.groups.index[0].status, Status::IndexAdded);
    assert_eq!(snapshot.groups.working_tree[0].status, Status::Deleted);
    assert_eq!(
        snapshot.groups.untracked[0].path,
        PathBuf::from("/repo/scratch.txt")
    );
    assert_eq!(model.state(), RepositoryState::Idle);
}

#[tokio::test]
async fn open_outside_repository_fails() {
    let spawner = MockSpawner::new();
    spawner.on(
        &["rev-parse", "--show-toplevel"],
        MockResponse::fail("fatal: not a git repository (or any of the parent directories): .git")
            .with_exit_code(128),
    );
    let collaborators = Collaborators {
        spawner: Arc::new(spawner),
        fs: Arc::new(MemoryFileSystem::new()),
    };

    let err = RepositoryModel::open(Path::new("/elsewhere"), collaborators, EngineConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Git(ref e) if e.is(GitErrorKind::NotAGitRepository)));
}

// =============================================================================
// Mutations
// =============================================================================

#[tokio::test]
async fn commit_refreshes_snapshot() {
    let fx = Fixture::new();
    fx.spawner.on(&["status", "-z"], MockResponse::ok("M  a.rs\0"));
    let model = fx.open(EngineConfig::default()).await;
    assert_eq!(model.snapshot().groups.index.len(), 1);

    fx.spawner.set(&["status", "-z"], MockResponse::ok(""));
    model
        .commit(Some("Add a"), CommitOptions::default())
        .await
        .unwrap();

    let commits = fx.spawner.calls_matching(&["commit", "--quiet"]);
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].input.as_deref(), Some("Add a"));
    assert!(model.snapshot().groups.is_empty());
}

#[tokio::test]
async fn failed_commit_reports_classified_error() {
    let fx = Fixture::new();
    let model = fx.open(EngineConfig::default()).await;
    fx.spawner.on(
        &["commit"],
        MockResponse::fail("Author identity unknown\n\n*** Please tell me who you are.")
            .with_exit_code(128),
    );

    let err = model
        .commit(Some("msg"), CommitOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.git_kind(), Some(GitErrorKind::NoUserNameConfigured));
    assert!(model.ledger().running().is_empty());
}

#[tokio::test]
async fn operations_are_observable() {
    let fx = Fixture::new();
    let model = fx.open(EngineConfig::default()).await;
    let mut events = model.operations();

    model.stage(&[PathBuf::from("/repo/a.rs")]).await.unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(seen.iter().any(|e| matches!(
        e,
        OperationEvent::Started { operation } if operation.kind == OperationKind::Add
    )));
    assert!(seen.iter().any(|e| matches!(
        e,
        OperationEvent::Finished { operation, success: true, .. } if operation.kind == OperationKind::Add
    )));
    assert!(model.ledger().is_idle());
}

// =============================================================================
// Disposal
// =============================================================================

#[tokio::test]
async fn disposed_model_refuses_work() {
    let fx = Fixture::new();
    let model = fx.open(EngineConfig::default()).await;
    model.dispose();
    let before = fx.spawner.call_count();

    let err = model.stage(&[PathBuf::from("/repo/a.rs")]).await.unwrap_err();
    assert!(matches!(err, EngineError::Disposed));
    assert_eq!(fx.spawner.call_count(), before);
    assert!(model.is_disposed());
}
