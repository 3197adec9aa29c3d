//! git::fs
//!
//! Filesystem collaborator used for the few `.git` files read directly
//! (`HEAD`, `config`, `MERGE_HEAD`, rebase markers) and `.gitmodules`.

use std::io;
use std::path::Path;

use async_trait::async_trait;

/// Read-only filesystem access.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// True when `path` exists (file or directory).
    async fn exists(&self, path: &Path) -> bool;

    /// Whole-file UTF-8 read.
    async fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// [`FileSystem`] backed by `tokio::fs`.
#[derive(Debug, Clone, Default)]
pub struct TokioFileSystem;

#[async_trait]
impl FileSystem for TokioFileSystem {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }
}
