//! Trash ledger
//!
//! Trashed items live in a hidden directory next to a JSON sidecar that
//! records where each one came from. The sidecar is the only source of
//! truth for what is "in trash"; files without an entry are orphans and
//! are never advertised. Each mutating call reads the sidecar once and
//! rewrites it once, as its final step, behind a per-ledger gate.

use crate::config::TrashConfig;
use crate::{AppError, BatchOutcome, Result};
use app_fs::{
    file_name, join_path, parent_path, sanitize_name, truncate_name, FileType, StorageBackend,
    VirtualNode, MAX_NAME_BYTES, TRASH_ID,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Collision suffixes tried before an item is reported as failed
const MAX_SLOT_ATTEMPTS: usize = 1000;

/// One trashed item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashEntry {
    /// Current path inside the trash directory
    pub id: String,
    pub original_path: String,
    pub name: String,
    /// Unix epoch, milliseconds
    pub deleted_at: i64,
    pub size: u64,
    #[serde(rename = "type")]
    pub file_type: FileType,
}

impl TrashEntry {
    pub fn to_node(&self) -> VirtualNode {
        let mut node = VirtualNode::folder(self.id.clone(), Some(TRASH_ID.to_string()), self.name.clone());
        node.file_type = self.file_type;
        node.size = self.size;
        node.updated_at = self.deleted_at;
        node.is_trash = true;
        node.is_encrypted = self.file_type != FileType::Folder && self.name.ends_with(".enc");
        node.original_path = Some(self.original_path.clone());
        node
    }
}

/// Sole writer of the trash directory and its sidecar
pub struct TrashLedger {
    backend: Arc<dyn StorageBackend>,
    trash_dir: String,
    index_path: String,
    temp_path: String,
    gate: Mutex<()>,
}

impl TrashLedger {
    pub fn new(backend: Arc<dyn StorageBackend>, config: &TrashConfig) -> Self {
        let trash_dir = config.dir_name.trim_matches('/').to_string();
        let index_path = join_path(&trash_dir, &config.index_file);
        let temp_path = format!("{}.tmp", index_path);

        Self {
            backend,
            trash_dir,
            index_path,
            temp_path,
            gate: Mutex::new(()),
        }
    }

    pub fn trash_dir(&self) -> &str {
        &self.trash_dir
    }

    /// Whether a real path is the trash directory or lies inside it
    pub fn contains_path(&self, path: &str) -> bool {
        path == self.trash_dir || path.starts_with(&format!("{}/", self.trash_dir))
    }

    /// Current ledger entries, as recorded
    pub async fn entries(&self) -> Vec<TrashEntry> {
        let _gate = self.gate.lock().await;
        self.load().await.unwrap_or_default()
    }

    /// Trash listing. Never fails: an absent or unreadable sidecar is an
    /// empty trash. Entries whose backing file vanished are pruned and the
    /// pruned ledger is written back.
    pub async fn list(&self) -> Vec<VirtualNode> {
        let _gate = self.gate.lock().await;

        let entries = match self.load().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Trash ledger unreadable, showing empty trash: {}", e);
                return Vec::new();
            }
        };

        let total = entries.len();
        let mut live = Vec::with_capacity(total);
        for entry in entries {
            match self.backend.exists(&entry.id).await {
                Ok(false) => tracing::debug!("Pruning dangling trash entry {}", entry.id),
                Ok(true) => live.push(entry),
                Err(e) => {
                    tracing::debug!("Cannot stat trash entry {}: {}", entry.id, e);
                    live.push(entry);
                }
            }
        }

        if live.len() != total {
            if let Err(e) = self.store(&live).await {
                tracing::warn!("Failed to write pruned trash ledger: {}", e);
            } else {
                tracing::info!("Pruned {} dangling trash entries", total - live.len());
            }
        }

        live.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        live.iter().map(TrashEntry::to_node).collect()
    }

    /// Move live items into the trash
    pub async fn trash<S: AsRef<str>>(&self, ids: &[S]) -> Result<BatchOutcome> {
        let _gate = self.gate.lock().await;

        self.backend.mkdir(&self.trash_dir, true).await?;
        let mut entries = self.load().await?;
        let mut outcome = BatchOutcome::default();
        let mut moved: Vec<(String, String)> = Vec::new();

        for id in ids {
            let id = id.as_ref().trim_matches('/');
            if id.is_empty() || self.contains_path(id) {
                outcome.fail(id, AppError::InvalidPath(format!("cannot trash {:?}", id)));
                continue;
            }

            let meta = match self.backend.stat(id).await {
                Ok(meta) => meta,
                Err(e) if e.is_not_found() => {
                    tracing::debug!("Skipping missing item {}", id);
                    outcome.skip(id);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Cannot stat {}: {}", id, e);
                    outcome.fail(id, e);
                    continue;
                }
            };

            let name = file_name(id).to_string();
            let deleted_at = Utc::now().timestamp_millis();
            let trash_path = match self.unique_trash_path(&name, deleted_at, &entries).await {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!("No trash slot for {}: {}", id, e);
                    outcome.fail(id, e);
                    continue;
                }
            };

            if let Err(e) = self.backend.rename(id, &trash_path).await {
                tracing::warn!("Failed to move {} to trash: {}", id, e);
                outcome.fail(id, e);
                continue;
            }

            tracing::debug!("Trashed {} -> {}", id, trash_path);
            entries.push(TrashEntry {
                id: trash_path.clone(),
                original_path: id.to_string(),
                file_type: if meta.is_dir { FileType::Folder } else { FileType::from_name(&name) },
                name,
                deleted_at,
                size: meta.size,
            });
            moved.push((trash_path, id.to_string()));
            outcome.complete(id);
        }

        if !moved.is_empty() {
            if let Err(e) = self.store(&entries).await {
                tracing::error!("Trash ledger write failed, moving {} items back: {}", moved.len(), e);
                for (trash_path, original) in moved.iter().rev() {
                    if let Err(err) = self.backend.rename(trash_path, original).await {
                        tracing::error!("Rollback of {} failed, left orphaned at {}: {}", original, trash_path, err);
                    }
                }
                return Err(AppError::Ledger(e.to_string()));
            }
        }

        tracing::info!("Moved {} items to trash", outcome.completed.len());
        Ok(outcome)
    }

    /// Move trashed items back to their original paths. An item that
    /// cannot be restored keeps its entry.
    pub async fn restore<S: AsRef<str>>(&self, ids: &[S]) -> Result<BatchOutcome> {
        let _gate = self.gate.lock().await;

        let wanted: HashSet<&str> = ids.iter().map(|s| s.as_ref()).collect();
        let entries = self.load().await?;
        let before = entries.len();
        let mut outcome = BatchOutcome::default();
        let mut kept = Vec::with_capacity(before);
        let mut seen = HashSet::new();

        for entry in entries {
            if !wanted.contains(entry.id.as_str()) {
                kept.push(entry);
                continue;
            }
            seen.insert(entry.id.clone());

            match self.restore_one(&entry).await {
                Ok(()) => {
                    tracing::debug!("Restored {} -> {}", entry.id, entry.original_path);
                    outcome.complete(entry.id);
                }
                Err(e) if e.is_not_found() => {
                    // Backing file is gone; the entry is dangling
                    tracing::warn!("Trash entry {} has no backing file, dropping it", entry.id);
                    outcome.fail(entry.id, e);
                }
                Err(e) => {
                    tracing::warn!("Failed to restore {}: {}", entry.original_path, e);
                    outcome.fail(entry.id.clone(), e);
                    kept.push(entry);
                }
            }
        }

        for id in wanted.into_iter().filter(|id| !seen.contains(*id)) {
            outcome.skip(id);
        }

        if kept.len() != before {
            self.store(&kept).await?;
        }

        tracing::info!("Restored {} items from trash", outcome.completed.len());
        Ok(outcome)
    }

    async fn restore_one(&self, entry: &TrashEntry) -> Result<()> {
        if !self.backend.exists(&entry.id).await? {
            return Err(AppError::NotFound(entry.id.clone()));
        }

        if let Some(parent) = parent_path(&entry.original_path) {
            self.backend.mkdir(parent, true).await?;
        }

        self.backend.rename(&entry.id, &entry.original_path).await?;
        Ok(())
    }

    /// Delete trashed items for good. The ledger entry is dropped even when
    /// the physical delete fails; that failure is logged and reported, and
    /// the file stays on disk untracked.
    pub async fn delete_permanent<S: AsRef<str>>(&self, ids: &[S]) -> Result<BatchOutcome> {
        let _gate = self.gate.lock().await;

        let wanted: HashSet<&str> = ids.iter().map(|s| s.as_ref()).collect();
        let entries = self.load().await?;
        let before = entries.len();
        let mut outcome = BatchOutcome::default();
        let mut kept = Vec::with_capacity(before);
        let mut seen = HashSet::new();

        for entry in entries {
            if !wanted.contains(entry.id.as_str()) {
                kept.push(entry);
                continue;
            }
            seen.insert(entry.id.clone());

            match self.remove_backing(&entry.id).await {
                Ok(()) => outcome.complete(entry.id),
                Err(e) => {
                    tracing::warn!("Permanent delete of {} failed, dropping its entry anyway: {}", entry.id, e);
                    outcome.fail(entry.id, e);
                }
            }
        }

        for id in wanted.into_iter().filter(|id| !seen.contains(*id)) {
            outcome.skip(id);
        }

        if kept.len() != before {
            self.store(&kept).await?;
        }

        tracing::info!("Permanently deleted {} items", outcome.completed.len());
        Ok(outcome)
    }

    async fn remove_backing(&self, path: &str) -> Result<()> {
        let meta = match self.backend.stat(path).await {
            Ok(meta) => meta,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if meta.is_dir {
            self.backend.rmdir(path, true).await?;
        } else {
            self.backend.delete(path).await?;
        }
        Ok(())
    }

    /// Remove everything in the trash.
    ///
    /// The whole directory, sidecar included, is renamed aside in one step
    /// before a fresh directory and empty sidecar are created, so a crash
    /// leaves either the old trash or the new one. The renamed directory is
    /// purged last; leftovers are cleaned by [`TrashLedger::recover`].
    pub async fn empty(&self) -> Result<()> {
        let _gate = self.gate.lock().await;

        let purge_dir = format!("{}.purge-{}", self.trash_dir, Utc::now().timestamp_millis());
        let moved_aside = match self.backend.rename(&self.trash_dir, &purge_dir).await {
            Ok(()) => true,
            Err(e) if e.is_not_found() => false,
            Err(e) => return Err(e.into()),
        };

        self.store(&[]).await?;

        if moved_aside {
            if let Err(e) = self.backend.rmdir(&purge_dir, true).await {
                tracing::warn!("Failed to purge {}: {}", purge_dir, e);
            }
        }

        tracing::info!("Trash emptied");
        Ok(())
    }

    /// Remove purge directories left behind by an interrupted
    /// [`TrashLedger::empty`]. Returns how many were removed.
    pub async fn recover(&self) -> Result<usize> {
        let _gate = self.gate.lock().await;

        let parent = parent_path(&self.trash_dir).unwrap_or("");
        let prefix = format!("{}.purge-", file_name(&self.trash_dir));

        let mut removed = 0;
        for entry in self.backend.list(parent).await? {
            if !entry.is_dir || !entry.name.starts_with(&prefix) {
                continue;
            }

            let path = join_path(parent, &entry.name);
            match self.backend.rmdir(&path, true).await {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!("Failed to remove leftover {}: {}", path, e),
            }
        }

        if removed > 0 {
            tracing::info!("Removed {} leftover trash purge directories", removed);
        }
        Ok(removed)
    }

    /// Read the sidecar. A missing sidecar falls back to a leftover temp
    /// file from an interrupted write, then to an empty ledger. An
    /// unparsable one is moved aside to `<index>.corrupt-<millis>` and
    /// the ledger starts empty; if it cannot be moved the load fails.
    async fn load(&self) -> Result<Vec<TrashEntry>> {
        let (raw, source) = match self.backend.read(&self.index_path).await {
            Ok(raw) => (raw, &self.index_path),
            Err(e) if e.is_not_found() => match self.backend.read(&self.temp_path).await {
                Ok(raw) => {
                    tracing::info!("Recovering trash ledger from {}", self.temp_path);
                    (raw, &self.temp_path)
                }
                Err(_) => return Ok(Vec::new()),
            },
            Err(e) => return Err(AppError::Ledger(e.to_string())),
        };

        match serde_json::from_slice(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                let aside = format!("{}.corrupt-{}", self.index_path, Utc::now().timestamp_millis());
                self.backend
                    .rename(source, &aside)
                    .await
                    .map_err(|err| AppError::Ledger(format!("corrupt ledger could not be moved aside: {}", err)))?;
                tracing::warn!("Trash ledger is corrupt ({}), kept as {} and starting from empty", e, aside);
                Ok(Vec::new())
            }
        }
    }

    /// Write the sidecar via temp file + rename
    async fn store(&self, entries: &[TrashEntry]) -> Result<()> {
        let json = serde_json::to_vec_pretty(entries).map_err(|e| AppError::Ledger(e.to_string()))?;
        let ledger_err = |e: app_fs::FsError| AppError::Ledger(e.to_string());

        self.backend.mkdir(&self.trash_dir, true).await.map_err(ledger_err)?;
        self.backend.write(&self.temp_path, &json).await.map_err(ledger_err)?;

        match self.backend.delete(&self.index_path).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(ledger_err(e)),
        }

        self.backend
            .rename(&self.temp_path, &self.index_path)
            .await
            .map_err(ledger_err)
    }

    /// `<trash>/<timestamp>_<name>`, with a counter when that is taken.
    /// The name is shortened so the whole component stays within
    /// [`MAX_NAME_BYTES`].
    async fn unique_trash_path(&self, name: &str, timestamp: i64, entries: &[TrashEntry]) -> Result<String> {
        let name = sanitize_name(name);

        for attempt in 0..MAX_SLOT_ATTEMPTS {
            let prefix = if attempt == 0 {
                format!("{}_", timestamp)
            } else {
                format!("{}-{}_", timestamp, attempt)
            };
            let slot = format!("{}{}", prefix, truncate_name(&name, MAX_NAME_BYTES - prefix.len()));
            let candidate = join_path(&self.trash_dir, &slot);

            if entries.iter().any(|e| e.id == candidate) {
                continue;
            }
            if !self.backend.exists(&candidate).await? {
                return Ok(candidate);
            }
        }

        Err(AppError::AlreadyExists(format!("no free trash slot for {:?}", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use app_fs::LocalBackend;
    use tempfile::TempDir;

    fn ledger() -> (TempDir, Arc<LocalBackend>, TrashLedger) {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(LocalBackend::new(dir.path()));
        let ledger = TrashLedger::new(backend.clone(), &TrashConfig::default());
        (dir, backend, ledger)
    }

    #[tokio::test]
    async fn test_trash_and_restore() {
        let (dir, _backend, ledger) = ledger();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/report.txt"), vec![7u8; 500]).unwrap();

        let outcome = ledger.trash(&["docs/report.txt"]).await.unwrap();
        assert_eq!(outcome.completed, vec!["docs/report.txt"]);
        assert!(!dir.path().join("docs/report.txt").exists());

        let entries = ledger.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].original_path, "docs/report.txt");
        assert_eq!(entries[0].size, 500);
        assert!(entries[0].id.starts_with(".trash/"));

        // Parent directory is recreated on restore
        std::fs::remove_dir(dir.path().join("docs")).unwrap();
        let outcome = ledger.restore(&[entries[0].id.as_str()]).await.unwrap();
        assert_eq!(outcome.completed.len(), 1);
        assert_eq!(std::fs::metadata(dir.path().join("docs/report.txt")).unwrap().len(), 500);
        assert!(ledger.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_source_is_skipped() {
        let (dir, _backend, ledger) = ledger();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();

        let outcome = ledger.trash(&["gone.txt", "a.txt"]).await.unwrap();
        assert_eq!(outcome.skipped, vec!["gone.txt"]);
        assert_eq!(outcome.completed, vec!["a.txt"]);
        assert!(outcome.is_clean());
    }

    #[tokio::test]
    async fn test_cannot_trash_the_trash() {
        let (_dir, _backend, ledger) = ledger();
        let outcome = ledger.trash(&[".trash", ".trash/.index.json", ""]).await.unwrap();
        assert_eq!(outcome.failed.len(), 3);
    }

    #[tokio::test]
    async fn test_same_name_twice_gets_distinct_slots() {
        let (dir, _backend, ledger) = ledger();
        std::fs::create_dir_all(dir.path().join("x")).unwrap();
        std::fs::write(dir.path().join("a.txt"), b"1").unwrap();
        std::fs::write(dir.path().join("x/a.txt"), b"2").unwrap();

        ledger.trash(&["a.txt", "x/a.txt"]).await.unwrap();
        let entries = ledger.entries().await;
        assert_eq!(entries.len(), 2);
        assert_ne!(entries[0].id, entries[1].id);
    }

    #[tokio::test]
    async fn test_restore_conflict_keeps_entry() {
        let (dir, _backend, ledger) = ledger();
        std::fs::write(dir.path().join("a.txt"), b"old").unwrap();
        ledger.trash(&["a.txt"]).await.unwrap();
        std::fs::write(dir.path().join("a.txt"), b"new").unwrap();

        let id = ledger.entries().await[0].id.clone();
        let outcome = ledger.restore(&[id.as_str()]).await.unwrap();
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(ledger.entries().await.len(), 1);
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_list_prunes_dangling_entries() {
        let (dir, _backend, ledger) = ledger();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"b").unwrap();
        ledger.trash(&["a.txt", "b.txt"]).await.unwrap();

        let victim = ledger.entries().await[0].id.clone();
        std::fs::remove_file(dir.path().join(&victim)).unwrap();

        let nodes = ledger.list().await;
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].is_trash);
        assert_eq!(nodes[0].parent_id.as_deref(), Some(TRASH_ID));

        // Pruning was persisted
        assert_eq!(ledger.entries().await.len(), 1);
    }

    fn corrupt_copies(dir: &TempDir) -> Vec<Vec<u8>> {
        std::fs::read_dir(dir.path().join(".trash"))
            .unwrap()
            .map(|e| e.unwrap())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".index.json.corrupt-"))
            .map(|e| std::fs::read(e.path()).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_corrupt_ledger_lists_empty() {
        let (dir, _backend, ledger) = ledger();
        std::fs::create_dir_all(dir.path().join(".trash")).unwrap();
        std::fs::write(dir.path().join(".trash/.index.json"), b"{not json").unwrap();

        assert!(ledger.list().await.is_empty());
        assert_eq!(corrupt_copies(&dir), vec![b"{not json".to_vec()]);
    }

    #[tokio::test]
    async fn test_corrupt_ledger_is_kept_aside_before_mutation() {
        let (dir, _backend, ledger) = ledger();
        std::fs::create_dir_all(dir.path().join(".trash")).unwrap();
        std::fs::write(dir.path().join(".trash/.index.json"), b"[{\"id\": truncated").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();

        let outcome = ledger.trash(&["a.txt"]).await.unwrap();
        assert_eq!(outcome.completed, vec!["a.txt"]);
        assert_eq!(ledger.entries().await.len(), 1);
        assert_eq!(corrupt_copies(&dir), vec![b"[{\"id\": truncated".to_vec()]);
    }

    #[tokio::test]
    async fn test_long_name_fits_trash_slot() {
        let (dir, _backend, ledger) = ledger();
        let name = format!("{}.txt", "n".repeat(246));
        std::fs::write(dir.path().join(&name), b"long").unwrap();

        let outcome = ledger.trash(&[name.as_str()]).await.unwrap();
        assert_eq!(outcome.completed, vec![name.clone()]);

        let entries = ledger.entries().await;
        let entry = &entries[0];
        assert!(file_name(&entry.id).len() <= MAX_NAME_BYTES);
        assert_eq!(entry.name, name);

        ledger.restore(&[entry.id.as_str()]).await.unwrap();
        assert_eq!(std::fs::read(dir.path().join(&name)).unwrap(), b"long");
    }

    #[tokio::test]
    async fn test_temp_file_recovered_when_index_missing() {
        let (dir, _backend, ledger) = ledger();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        ledger.trash(&["a.txt"]).await.unwrap();

        // Simulate a crash between deleting the index and renaming the temp file
        let trash = dir.path().join(".trash");
        std::fs::rename(trash.join(".index.json"), trash.join(".index.json.tmp")).unwrap();

        assert_eq!(ledger.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_permanent_and_empty() {
        let (dir, _backend, ledger) = ledger();
        std::fs::create_dir_all(dir.path().join("folder/sub")).unwrap();
        std::fs::write(dir.path().join("folder/sub/f.bin"), b"x").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        ledger.trash(&["folder", "a.txt"]).await.unwrap();

        let entries = ledger.entries().await;
        let folder = entries.iter().find(|e| e.original_path == "folder").unwrap();
        assert_eq!(folder.file_type, FileType::Folder);

        let outcome = ledger.delete_permanent(&[folder.id.as_str()]).await.unwrap();
        assert_eq!(outcome.completed.len(), 1);
        assert!(!dir.path().join(&folder.id).exists());
        assert_eq!(ledger.entries().await.len(), 1);

        ledger.empty().await.unwrap();
        assert!(ledger.entries().await.is_empty());
        assert!(dir.path().join(".trash").is_dir());
        assert_eq!(std::fs::read_dir(dir.path().join(".trash")).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_recover_removes_purge_dirs() {
        let (dir, _backend, ledger) = ledger();
        std::fs::create_dir_all(dir.path().join(".trash.purge-1700000000000/x")).unwrap();
        std::fs::create_dir_all(dir.path().join("Documents")).unwrap();

        assert_eq!(ledger.recover().await.unwrap(), 1);
        assert!(!dir.path().join(".trash.purge-1700000000000").exists());
        assert!(dir.path().join("Documents").exists());
    }
}
