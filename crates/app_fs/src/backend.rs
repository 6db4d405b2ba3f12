//! Storage backend contract consumed by the façade

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One child returned by [`StorageBackend::list`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    /// Last modified timestamp (Unix epoch, milliseconds)
    pub mtime: i64,
}

/// Result of [`StorageBackend::stat`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub is_dir: bool,
    pub size: u64,
    pub mtime: i64,
}

/// Drive capacity in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    pub total: u64,
    pub free: u64,
}

/// Primitive I/O over a single hierarchical namespace.
///
/// Paths are relative to the backend root, `/`-separated, and the empty
/// string addresses the root itself. Every call is a suspension point.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// List the children of a directory
    async fn list(&self, path: &str) -> Result<Vec<DirEntry>>;

    /// Stat a file or directory
    async fn stat(&self, path: &str) -> Result<Metadata>;

    /// Read a whole file
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Create or truncate a file with `data`
    async fn write(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Rename `from` to `to`. Fails if the destination exists.
    async fn rename(&self, from: &str, to: &str) -> Result<()>;

    /// Delete a file
    async fn delete(&self, path: &str) -> Result<()>;

    async fn mkdir(&self, path: &str, recursive: bool) -> Result<()>;

    async fn rmdir(&self, path: &str, recursive: bool) -> Result<()>;

    /// Drive capacity, when the platform reports it
    async fn capacity(&self) -> Result<Option<Capacity>> {
        Ok(None)
    }

    /// Check whether a path exists
    async fn exists(&self, path: &str) -> Result<bool> {
        match self.stat(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
