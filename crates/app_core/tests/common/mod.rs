//! Shared fixtures for façade integration tests
#![allow(dead_code)]

use app_core::{AppConfig, BookmarkStore, Filer, TrashEntry};
use app_fs::{Capacity, DirEntry, FsError, LocalBackend, Metadata, StorageBackend};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Local backend with switchable faults
pub struct FaultyBackend {
    inner: LocalBackend,
    fail_delete: Mutex<Vec<String>>,
    fail_write: Mutex<Vec<String>>,
    fail_rename: Mutex<Vec<String>>,
    fail_stat: Mutex<Vec<String>>,
    list_delay: Mutex<Option<Duration>>,
}

fn matches_any(prefixes: &Mutex<Vec<String>>, path: &str) -> bool {
    prefixes.lock().iter().any(|p| path.starts_with(p.as_str()))
}

fn injected(path: &str) -> FsError {
    FsError::PermissionDenied(format!("injected fault: {}", path))
}

impl FaultyBackend {
    pub fn new(root: PathBuf) -> Self {
        Self {
            inner: LocalBackend::new(root),
            fail_delete: Mutex::new(Vec::new()),
            fail_write: Mutex::new(Vec::new()),
            fail_rename: Mutex::new(Vec::new()),
            fail_stat: Mutex::new(Vec::new()),
            list_delay: Mutex::new(None),
        }
    }

    /// Fail `delete` for paths starting with `prefix`
    pub fn fail_delete(&self, prefix: &str) {
        self.fail_delete.lock().push(prefix.to_string());
    }

    /// Fail `write` for paths starting with `prefix`
    pub fn fail_write(&self, prefix: &str) {
        self.fail_write.lock().push(prefix.to_string());
    }

    /// Fail `rename` for sources starting with `prefix`
    pub fn fail_rename(&self, prefix: &str) {
        self.fail_rename.lock().push(prefix.to_string());
    }

    /// Fail `stat` (and so `exists`) for paths starting with `prefix`
    pub fn fail_stat(&self, prefix: &str) {
        self.fail_stat.lock().push(prefix.to_string());
    }

    pub fn slow_list(&self, delay: Duration) {
        *self.list_delay.lock() = Some(delay);
    }

    pub fn clear_faults(&self) {
        self.fail_delete.lock().clear();
        self.fail_write.lock().clear();
        self.fail_rename.lock().clear();
        self.fail_stat.lock().clear();
        *self.list_delay.lock() = None;
    }
}

#[async_trait]
impl StorageBackend for FaultyBackend {
    async fn list(&self, path: &str) -> app_fs::Result<Vec<DirEntry>> {
        let delay = *self.list_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.list(path).await
    }

    async fn stat(&self, path: &str) -> app_fs::Result<Metadata> {
        if matches_any(&self.fail_stat, path) {
            return Err(injected(path));
        }
        self.inner.stat(path).await
    }

    async fn read(&self, path: &str) -> app_fs::Result<Vec<u8>> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &str, data: &[u8]) -> app_fs::Result<()> {
        if matches_any(&self.fail_write, path) {
            return Err(injected(path));
        }
        self.inner.write(path, data).await
    }

    async fn rename(&self, from: &str, to: &str) -> app_fs::Result<()> {
        if matches_any(&self.fail_rename, from) {
            return Err(injected(from));
        }
        self.inner.rename(from, to).await
    }

    async fn delete(&self, path: &str) -> app_fs::Result<()> {
        if matches_any(&self.fail_delete, path) {
            return Err(injected(path));
        }
        self.inner.delete(path).await
    }

    async fn mkdir(&self, path: &str, recursive: bool) -> app_fs::Result<()> {
        self.inner.mkdir(path, recursive).await
    }

    async fn rmdir(&self, path: &str, recursive: bool) -> app_fs::Result<()> {
        self.inner.rmdir(path, recursive).await
    }

    async fn capacity(&self) -> app_fs::Result<Option<Capacity>> {
        Ok(Some(Capacity {
            total: 64 << 30,
            free: 16 << 30,
        }))
    }
}

/// A granted façade over a temp storage root
pub struct Fixture {
    pub dir: TempDir,
    pub backend: Arc<FaultyBackend>,
    pub filer: Arc<Filer>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("storage");
        std::fs::create_dir_all(&root).unwrap();

        let backend = Arc::new(FaultyBackend::new(root));
        let kv = app_db::open(&dir.path().join("db")).unwrap();
        let filer = Filer::new(backend.clone(), BookmarkStore::open(kv).unwrap(), &config);
        filer.set_storage_permission(true);

        Self {
            dir,
            backend,
            filer: Arc::new(filer),
        }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join("storage").join(rel)
    }

    pub fn write(&self, rel: &str, data: &[u8]) {
        let path = self.path(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    pub fn read(&self, rel: &str) -> Vec<u8> {
        std::fs::read(self.path(rel)).unwrap()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    /// Ledger as stored on disk
    pub fn ledger_on_disk(&self) -> Vec<TrashEntry> {
        match std::fs::read(self.path(".trash/.index.json")) {
            Ok(raw) => serde_json::from_slice(&raw).unwrap(),
            Err(_) => Vec::new(),
        }
    }

    /// Every stored ledger entry has a backing file
    pub fn assert_ledger_consistent(&self) {
        for entry in self.ledger_on_disk() {
            assert!(self.exists(&entry.id), "dangling ledger entry {}", entry.id);
        }
    }
}
