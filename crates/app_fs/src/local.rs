//! Storage backend over the local filesystem (tokio::fs)

use crate::{DirEntry, FsError, Metadata, Result, StorageBackend};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Backend rooted at a device storage directory
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The storage root on the host filesystem
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a relative backend path onto the host filesystem.
    /// Absolute paths and `..`/`.` components are rejected.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let mut resolved = self.root.clone();

        for component in Path::new(path).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                _ => return Err(FsError::InvalidPath(path.to_string())),
            }
        }

        Ok(resolved)
    }
}

fn mtime_millis(metadata: &std::fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[async_trait]
impl StorageBackend for LocalBackend {
    async fn list(&self, path: &str) -> Result<Vec<DirEntry>> {
        let dir = self.resolve(path)?;
        let mut read_dir = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| FsError::from_io(e, path))?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| FsError::from_io(e, path))?
        {
            // Race-deleted or unreadable entries are skipped
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry {:?}: {}", entry.path(), e);
                    continue;
                }
            };

            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                is_dir: metadata.is_dir(),
                size: if metadata.is_dir() { 0 } else { metadata.len() },
                mtime: mtime_millis(&metadata),
            });
        }

        Ok(entries)
    }

    async fn stat(&self, path: &str) -> Result<Metadata> {
        let target = self.resolve(path)?;
        let metadata = tokio::fs::metadata(&target)
            .await
            .map_err(|e| FsError::from_io(e, path))?;

        Ok(Metadata {
            is_dir: metadata.is_dir(),
            size: if metadata.is_dir() { 0 } else { metadata.len() },
            mtime: mtime_millis(&metadata),
        })
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let target = self.resolve(path)?;
        tokio::fs::read(&target)
            .await
            .map_err(|e| FsError::from_io(e, path))
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let target = self.resolve(path)?;
        tokio::fs::write(&target, data)
            .await
            .map_err(|e| FsError::from_io(e, path))
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;

        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            return Err(FsError::AlreadyExists(to.to_string()));
        }

        tokio::fs::rename(&source, &target)
            .await
            .map_err(|e| FsError::from_io(e, from))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        tokio::fs::remove_file(&target)
            .await
            .map_err(|e| FsError::from_io(e, path))
    }

    async fn mkdir(&self, path: &str, recursive: bool) -> Result<()> {
        let target = self.resolve(path)?;
        let result = if recursive {
            tokio::fs::create_dir_all(&target).await
        } else {
            tokio::fs::create_dir(&target).await
        };
        result.map_err(|e| FsError::from_io(e, path))
    }

    async fn rmdir(&self, path: &str, recursive: bool) -> Result<()> {
        let target = self.resolve(path)?;
        if target == self.root {
            return Err(FsError::InvalidPath("refusing to remove storage root".into()));
        }

        let result = if recursive {
            tokio::fs::remove_dir_all(&target).await
        } else {
            tokio::fs::remove_dir(&target).await
        };
        result.map_err(|e| FsError::from_io(e, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn backend() -> (TempDir, LocalBackend) {
        let dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(dir.path());
        (dir, backend)
    }

    #[tokio::test]
    async fn test_write_stat_read() {
        let (_dir, fs) = backend();
        fs.mkdir("docs", false).await.unwrap();
        fs.write("docs/a.txt", b"hello").await.unwrap();

        let meta = fs.stat("docs/a.txt").await.unwrap();
        assert!(!meta.is_dir);
        assert_eq!(meta.size, 5);
        assert_eq!(fs.read("docs/a.txt").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_list_root() {
        let (_dir, fs) = backend();
        fs.mkdir("DCIM", false).await.unwrap();
        fs.write("note.txt", b"x").await.unwrap();

        let mut names: Vec<_> = fs.list("").await.unwrap().into_iter().map(|e| e.name).collect();
        names.sort();
        assert_eq!(names, vec!["DCIM", "note.txt"]);
    }

    #[tokio::test]
    async fn test_stat_missing_is_not_found() {
        let (_dir, fs) = backend();
        let err = fs.stat("nope").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!fs.exists("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_rename_refuses_existing_destination() {
        let (_dir, fs) = backend();
        fs.write("a", b"1").await.unwrap();
        fs.write("b", b"2").await.unwrap();

        assert!(matches!(fs.rename("a", "b").await, Err(FsError::AlreadyExists(_))));
        assert_eq!(fs.read("b").await.unwrap(), b"2");
    }

    #[tokio::test]
    async fn test_rejects_parent_traversal() {
        let (_dir, fs) = backend();
        assert!(matches!(fs.read("../etc/passwd").await, Err(FsError::InvalidPath(_))));
        assert!(matches!(fs.rmdir("", true).await, Err(FsError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_recursive_rmdir() {
        let (_dir, fs) = backend();
        fs.mkdir("a/b/c", true).await.unwrap();
        fs.write("a/b/c/f", b"x").await.unwrap();
        fs.rmdir("a", true).await.unwrap();
        assert!(!fs.exists("a").await.unwrap());
    }
}
