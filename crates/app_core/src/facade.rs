//! Virtual filesystem façade
//!
//! [`Filer`] is the one entry point the UI layer talks to. It parses ids
//! into [`VirtualId`] once, dispatches sentinel listings to the trash
//! ledger, the walker or the bookmark store, and hands real paths to the
//! storage backend. One instance is built at startup and shared by
//! reference.

use crate::bookmarks::BookmarkStore;
use crate::config::{AnalysisConfig, AppConfig, RecentConfig, SearchConfig};
use crate::crypto::PasswordCipher;
use crate::ledger::TrashLedger;
use crate::walker::{AnalysisResult, SearchOptions, TreeWalker, WalkLimits};
use crate::{AppError, BatchOutcome, Result};
use app_fs::{
    dir_id, file_name, join_path, parent_path, path_trail, sort_nodes, validate_name, DirEntry,
    FsError, ListOptions, Metadata, ResolvedListing, Sentinels, StorageBackend, VirtualId,
    VirtualNode,
};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use zeroize::Zeroizing;

const ENCRYPTED_SUFFIX: &str = ".enc";

pub struct Filer {
    backend: Arc<dyn StorageBackend>,
    sentinels: Sentinels,
    listing: RwLock<ListOptions>,
    ledger: TrashLedger,
    walker: TreeWalker,
    bookmarks: BookmarkStore,
    cipher: PasswordCipher,
    search: SearchConfig,
    analysis: AnalysisConfig,
    recent: RecentConfig,
    /// Platform storage permission; nothing touches storage until granted
    permission: AtomicBool,
    /// Token of the search in flight, if any
    search_token: Mutex<Option<CancellationToken>>,
}

impl Filer {
    pub fn new(backend: Arc<dyn StorageBackend>, bookmarks: BookmarkStore, config: &AppConfig) -> Self {
        let sentinels = config.sentinels();

        Self {
            ledger: TrashLedger::new(backend.clone(), &config.trash),
            walker: TreeWalker::new(backend.clone(), sentinels.clone()),
            backend,
            sentinels,
            listing: RwLock::new(config.listing),
            bookmarks,
            cipher: PasswordCipher::new(config.crypto.effective_iterations()),
            search: config.search.clone(),
            analysis: config.analysis.clone(),
            recent: config.recent.clone(),
            permission: AtomicBool::new(false),
            search_token: Mutex::new(None),
        }
    }

    // ========================================
    // Permission gate
    // ========================================

    pub fn set_storage_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::SeqCst);
        tracing::info!("Storage permission {}", if granted { "granted" } else { "revoked" });
    }

    pub fn has_storage_permission(&self) -> bool {
        self.permission.load(Ordering::SeqCst)
    }

    fn check_permission(&self) -> Result<()> {
        if self.has_storage_permission() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied("storage access not granted".to_string()))
        }
    }

    // ========================================
    // Namespace
    // ========================================

    pub fn sentinels(&self) -> &Sentinels {
        &self.sentinels
    }

    pub fn parse_id(&self, id: &str) -> VirtualId {
        VirtualId::parse(id, &self.sentinels)
    }

    pub fn list_options(&self) -> ListOptions {
        *self.listing.read()
    }

    pub fn set_list_options(&self, options: ListOptions) {
        *self.listing.write() = options;
    }

    /// Breadcrumb trail for any id
    pub fn path_trail(&self, id: &str) -> Vec<VirtualNode> {
        path_trail(&self.parse_id(id), &self.sentinels)
    }

    /// Children of a node
    pub async fn list(&self, id: &str) -> Result<Vec<VirtualNode>> {
        self.check_permission()?;

        match self.parse_id(id).resolve_listing(&self.sentinels) {
            ResolvedListing::Drives => Ok(self.drives().await),
            ResolvedListing::Trash => Ok(self.ledger.list().await),
            ResolvedListing::Recent => {
                let since = chrono::Utc::now().timestamp_millis()
                    - i64::from(self.recent.days) * 24 * 60 * 60 * 1000;
                self.walker
                    .recent(since, self.recent.limit, &self.search.seed_folders, self.limits(), &CancellationToken::new())
                    .await
            }
            ResolvedListing::Favorites => Ok(self.favorite_nodes().await),
            ResolvedListing::Category(file_type) => {
                self.walker
                    .category(file_type, &self.search.seed_folders, self.limits(), &CancellationToken::new())
                    .await
            }
            ResolvedListing::Vault(dir) => {
                self.backend.mkdir(&dir, true).await?;
                self.list_real(&dir).await
            }
            ResolvedListing::Real(path) => {
                if self.ledger.contains_path(&path) {
                    return Err(AppError::InvalidPath(path));
                }
                self.list_real(&path).await
            }
        }
    }

    /// Node for a single id
    pub async fn stat(&self, id: &str) -> Result<VirtualNode> {
        self.check_permission()?;

        match self.parse_id(id) {
            VirtualId::Path(path) => self.node_for(&path).await,
            VirtualId::Root => Err(AppError::NotFound(id.to_string())),
            other => other
                .sentinel_node(&self.sentinels)
                .ok_or_else(|| AppError::NotFound(id.to_string())),
        }
    }

    async fn drives(&self) -> Vec<VirtualNode> {
        let mut nodes = Vec::with_capacity(2);

        if let Some(mut internal) = VirtualId::InternalRoot.sentinel_node(&self.sentinels) {
            internal.capacity = match self.backend.capacity().await {
                Ok(capacity) => capacity,
                Err(e) => {
                    tracing::debug!("Capacity unavailable: {}", e);
                    None
                }
            };
            nodes.push(internal);
        }
        nodes.extend(VirtualId::Vault.sentinel_node(&self.sentinels));

        nodes
    }

    async fn list_real(&self, path: &str) -> Result<Vec<VirtualNode>> {
        let options = self.list_options();
        let parent = dir_id(path, &self.sentinels);

        let mut nodes: Vec<VirtualNode> = self
            .backend
            .list(path)
            .await?
            .iter()
            .filter(|entry| options.admits(entry))
            .filter_map(|entry| {
                let child = join_path(path, &entry.name);
                if self.is_reserved(&child) {
                    None
                } else {
                    Some(VirtualNode::from_entry(child, parent.clone(), entry))
                }
            })
            .collect();

        sort_nodes(&mut nodes, options.sort_by, options.sort_order);
        Ok(nodes)
    }

    async fn favorite_nodes(&self) -> Vec<VirtualNode> {
        let mut nodes = Vec::new();

        for id in self.bookmarks.ids() {
            match self.parse_id(&id) {
                VirtualId::Path(path) => match self.node_for(&path).await {
                    Ok(node) => nodes.push(node),
                    Err(e) => tracing::debug!("Skipping favorite {}: {}", id, e),
                },
                other => nodes.extend(other.sentinel_node(&self.sentinels)),
            }
        }

        nodes
    }

    /// Directories the façade manages itself
    fn is_reserved(&self, path: &str) -> bool {
        path == self.sentinels.vault_dir || self.ledger.contains_path(path)
    }

    /// Real path of an id that names a user item
    fn item_path(&self, id: &str) -> Result<String> {
        match self.parse_id(id) {
            VirtualId::Path(path) if !self.is_reserved(&path) => Ok(path),
            _ => Err(AppError::InvalidPath(id.to_string())),
        }
    }

    /// Real path of an id that can hold children
    fn dir_path(&self, id: &str) -> Result<String> {
        match self.parse_id(id) {
            VirtualId::InternalRoot => Ok(String::new()),
            VirtualId::Vault => Ok(self.sentinels.vault_dir.clone()),
            VirtualId::Path(path) if !self.ledger.contains_path(&path) => Ok(path),
            _ => Err(AppError::InvalidPath(id.to_string())),
        }
    }

    async fn node_for(&self, path: &str) -> Result<VirtualNode> {
        let meta = self.backend.stat(path).await?;
        Ok(self.project(path, &meta))
    }

    fn project(&self, path: &str, meta: &Metadata) -> VirtualNode {
        let entry = DirEntry {
            name: file_name(path).to_string(),
            is_dir: meta.is_dir,
            size: meta.size,
            mtime: meta.mtime,
        };
        let parent = dir_id(parent_path(path).unwrap_or(""), &self.sentinels);
        VirtualNode::from_entry(path.to_string(), parent, &entry)
    }

    // ========================================
    // Trash
    // ========================================

    /// Move items to the trash
    pub async fn trash<S: AsRef<str>>(&self, ids: &[S]) -> Result<BatchOutcome> {
        self.check_permission()?;

        let mut rejected = BatchOutcome::default();
        let mut paths = Vec::with_capacity(ids.len());
        for id in ids {
            match self.item_path(id.as_ref()) {
                Ok(path) => paths.push(path),
                Err(e) => rejected.fail(id.as_ref(), e),
            }
        }

        let mut outcome = self.ledger.trash(&paths).await?;
        outcome.merge(rejected);
        Ok(outcome)
    }

    /// Restore trashed items (ids are trash entry ids)
    pub async fn restore<S: AsRef<str>>(&self, ids: &[S]) -> Result<BatchOutcome> {
        self.check_permission()?;
        self.ledger.restore(ids).await
    }

    pub async fn delete_permanent<S: AsRef<str>>(&self, ids: &[S]) -> Result<BatchOutcome> {
        self.check_permission()?;
        self.ledger.delete_permanent(ids).await
    }

    pub async fn empty_trash(&self) -> Result<()> {
        self.check_permission()?;
        self.ledger.empty().await
    }

    /// Clean up after an interrupted run
    pub async fn recover(&self) -> Result<usize> {
        self.check_permission()?;
        self.ledger.recover().await
    }

    // ========================================
    // Encryption
    // ========================================

    /// Encrypt each file to `<name>.enc` and delete the original
    pub async fn encrypt_files<S: AsRef<str>>(&self, ids: &[S], password: &str) -> Result<BatchOutcome> {
        self.check_permission()?;

        let mut outcome = BatchOutcome::default();
        for id in ids {
            let id = id.as_ref();
            let source = match self.item_path(id) {
                Ok(path) if !path.ends_with(ENCRYPTED_SUFFIX) => path,
                Ok(_) => {
                    outcome.fail(id, AppError::InvalidPath(format!("{} is already encrypted", id)));
                    continue;
                }
                Err(e) => {
                    outcome.fail(id, e);
                    continue;
                }
            };
            let target = format!("{}{}", source, ENCRYPTED_SUFFIX);

            match self.transform_file(&source, &target, password, Direction::Encrypt).await {
                Ok(()) => {
                    tracing::debug!("Encrypted {}", source);
                    self.discard_source(&source).await;
                    outcome.complete(id);
                }
                Err(e) if e.is_not_found() => outcome.skip(id),
                Err(e) => {
                    tracing::warn!("Failed to encrypt {}: {}", source, e);
                    outcome.fail(id, e);
                }
            }
        }

        tracing::info!("Encrypted {} files", outcome.completed.len());
        Ok(outcome)
    }

    /// Decrypt each `<name>.enc` back to `<name>` and delete the envelope.
    ///
    /// The password is shared by the batch, so an authentication failure
    /// stops it and is returned as the error; the failing file is untouched.
    pub async fn decrypt_files<S: AsRef<str>>(&self, ids: &[S], password: &str) -> Result<BatchOutcome> {
        self.check_permission()?;

        let mut outcome = BatchOutcome::default();
        for id in ids {
            let id = id.as_ref();
            let source = match self.item_path(id) {
                Ok(path) if path.ends_with(ENCRYPTED_SUFFIX) => path,
                Ok(_) => {
                    outcome.fail(id, AppError::InvalidPath(format!("{} is not encrypted", id)));
                    continue;
                }
                Err(e) => {
                    outcome.fail(id, e);
                    continue;
                }
            };
            let target = source[..source.len() - ENCRYPTED_SUFFIX.len()].to_string();

            match self.transform_file(&source, &target, password, Direction::Decrypt).await {
                Ok(()) => {
                    tracing::debug!("Decrypted {}", source);
                    self.discard_source(&source).await;
                    outcome.complete(id);
                }
                Err(AppError::Authentication) => {
                    tracing::warn!("Decryption of {} failed authentication", source);
                    return Err(AppError::Authentication);
                }
                Err(e) if e.is_not_found() => outcome.skip(id),
                Err(e) => {
                    tracing::warn!("Failed to decrypt {}: {}", source, e);
                    outcome.fail(id, e);
                }
            }
        }

        tracing::info!("Decrypted {} files", outcome.completed.len());
        Ok(outcome)
    }

    async fn transform_file(&self, source: &str, target: &str, password: &str, direction: Direction) -> Result<()> {
        if self.backend.stat(source).await?.is_dir {
            return Err(AppError::InvalidPath(format!("{} is a folder", source)));
        }
        if self.backend.exists(target).await? {
            return Err(AppError::AlreadyExists(target.to_string()));
        }

        let input = self.backend.read(source).await?;
        let cipher = self.cipher;
        let password = Zeroizing::new(password.to_string());

        // PBKDF2 is CPU-bound
        let output = tokio::task::spawn_blocking(move || match direction {
            Direction::Encrypt => cipher.encrypt(&input, &password),
            Direction::Decrypt => cipher.decrypt(&input, &password),
        })
        .await
        .map_err(|e| AppError::Io(std::io::Error::other(e)))??;

        if let Err(e) = self.backend.write(target, &output).await {
            if let Err(cleanup) = self.backend.delete(target).await {
                if !cleanup.is_not_found() {
                    tracing::warn!("Could not remove partial output {}: {}", target, cleanup);
                }
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Best-effort delete of a source after a successful transform.
    /// Scoped storage can legitimately refuse this.
    async fn discard_source(&self, path: &str) {
        if let Err(e) = self.backend.delete(path).await {
            tracing::warn!("Could not delete original {}: {}", path, e);
        }
    }

    // ========================================
    // Search and analysis
    // ========================================

    fn limits(&self) -> WalkLimits {
        WalkLimits::from(&self.search)
    }

    /// Keyword search. Starting a search cancels the one in flight, which
    /// then returns [`AppError::Cancelled`].
    pub async fn search(&self, options: &SearchOptions) -> Result<Vec<VirtualNode>> {
        self.check_permission()?;

        let token = CancellationToken::new();
        let previous = self.search_token.lock().replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }

        let result = self
            .walker
            .search(options, &self.search.seed_folders, self.limits(), &token)
            .await;

        if let Ok(nodes) = &result {
            tracing::info!("Search {:?} found {} items", options.query, nodes.len());
        }
        result
    }

    pub fn cancel_search(&self) {
        if let Some(token) = self.search_token.lock().take() {
            token.cancel();
        }
    }

    /// Storage usage under a directory id (`root` means internal storage)
    pub async fn analyze_storage(&self, root_id: &str) -> Result<AnalysisResult> {
        self.check_permission()?;

        let root = match self.parse_id(root_id) {
            VirtualId::Root => String::new(),
            _ => self.dir_path(root_id)?,
        };
        if !self.backend.stat(&root).await?.is_dir {
            return Err(AppError::InvalidPath(root_id.to_string()));
        }

        let result = self.walker.analyze(&root, &self.analysis).await;
        tracing::info!("Analyzed {}: {} bytes", root_id, result.total_size);
        Ok(result)
    }

    // ========================================
    // File operations
    // ========================================

    pub async fn create_folder(&self, parent_id: &str, name: &str) -> Result<VirtualNode> {
        self.check_permission()?;
        validate_name(name)?;

        let parent = self.dir_path(parent_id)?;
        let path = join_path(&parent, name);
        if self.is_reserved(&path) {
            return Err(AppError::InvalidPath(path));
        }

        self.backend.mkdir(&path, false).await?;
        tracing::info!("Created folder {}", path);
        self.node_for(&path).await
    }

    pub async fn rename(&self, id: &str, new_name: &str) -> Result<VirtualNode> {
        self.check_permission()?;
        validate_name(new_name)?;

        let path = self.item_path(id)?;
        let target = join_path(parent_path(&path).unwrap_or(""), new_name);
        if target == path {
            return self.node_for(&path).await;
        }
        if self.is_reserved(&target) {
            return Err(AppError::InvalidPath(target));
        }

        self.backend.rename(&path, &target).await?;
        self.follow_bookmark(&path, &target);
        tracing::info!("Renamed {} -> {}", path, target);
        self.node_for(&target).await
    }

    /// Move items into a directory
    pub async fn move_to<S: AsRef<str>>(&self, ids: &[S], target_id: &str) -> Result<BatchOutcome> {
        self.check_permission()?;
        let target_dir = self.dir_path(target_id)?;

        let mut outcome = BatchOutcome::default();
        for id in ids {
            let id = id.as_ref();
            match self.move_one(id, &target_dir).await {
                Ok(()) => outcome.complete(id),
                Err(e) if e.is_not_found() => outcome.skip(id),
                Err(e) => {
                    tracing::warn!("Failed to move {}: {}", id, e);
                    outcome.fail(id, e);
                }
            }
        }

        tracing::info!("Moved {} items to {:?}", outcome.completed.len(), target_dir);
        Ok(outcome)
    }

    async fn move_one(&self, id: &str, target_dir: &str) -> Result<()> {
        let source = self.item_path(id)?;
        check_not_into_itself(&source, target_dir)?;

        let dest = join_path(target_dir, file_name(&source));
        if dest == source {
            return Ok(());
        }

        match self.backend.rename(&source, &dest).await {
            Ok(()) => {}
            Err(FsError::CrossDevice(_)) => {
                tracing::debug!("Cross-device move of {}, copying instead", source);
                self.copy_tree(&source, &dest).await?;
                self.remove_tree(&source).await?;
            }
            Err(e) => return Err(e.into()),
        }

        self.follow_bookmark(&source, &dest);
        Ok(())
    }

    /// Copy items into a directory; folders are copied recursively
    pub async fn copy_to<S: AsRef<str>>(&self, ids: &[S], target_id: &str) -> Result<BatchOutcome> {
        self.check_permission()?;
        let target_dir = self.dir_path(target_id)?;

        let mut outcome = BatchOutcome::default();
        for id in ids {
            let id = id.as_ref();
            let result = match self.item_path(id) {
                Ok(source) => match check_not_into_itself(&source, &target_dir) {
                    Ok(()) => {
                        let dest = join_path(&target_dir, file_name(&source));
                        self.copy_tree(&source, &dest).await
                    }
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => outcome.complete(id),
                Err(e) if e.is_not_found() => outcome.skip(id),
                Err(e) => {
                    tracing::warn!("Failed to copy {}: {}", id, e);
                    outcome.fail(id, e);
                }
            }
        }

        tracing::info!("Copied {} items to {:?}", outcome.completed.len(), target_dir);
        Ok(outcome)
    }

    async fn copy_tree(&self, source: &str, dest: &str) -> Result<()> {
        if self.backend.exists(dest).await? {
            return Err(AppError::AlreadyExists(dest.to_string()));
        }

        let mut pending = vec![(source.to_string(), dest.to_string())];
        while let Some((from, to)) = pending.pop() {
            if self.backend.stat(&from).await?.is_dir {
                self.backend.mkdir(&to, false).await?;
                for entry in self.backend.list(&from).await? {
                    pending.push((join_path(&from, &entry.name), join_path(&to, &entry.name)));
                }
            } else {
                let data = self.backend.read(&from).await?;
                self.backend.write(&to, &data).await?;
            }
        }
        Ok(())
    }

    async fn remove_tree(&self, path: &str) -> Result<()> {
        if self.backend.stat(path).await?.is_dir {
            self.backend.rmdir(path, true).await?;
        } else {
            self.backend.delete(path).await?;
        }
        Ok(())
    }

    fn follow_bookmark(&self, from: &str, to: &str) {
        if let Err(e) = self.bookmarks.rename(from, to) {
            tracing::warn!("Failed to update favorite {}: {}", from, e);
        }
    }

    // ========================================
    // Favorites
    // ========================================

    pub fn add_favorite(&self, id: &str) -> Result<bool> {
        self.bookmarks.add(id)
    }

    pub fn remove_favorite(&self, id: &str) -> Result<bool> {
        self.bookmarks.remove(id)
    }

    pub fn toggle_favorite(&self, id: &str) -> Result<bool> {
        self.bookmarks.toggle(id)
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.bookmarks.contains(id)
    }

    pub fn favorite_ids(&self) -> Vec<String> {
        self.bookmarks.ids()
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Encrypt,
    Decrypt,
}

fn check_not_into_itself(source: &str, target_dir: &str) -> Result<()> {
    if target_dir == source || target_dir.starts_with(&format!("{}/", source)) {
        return Err(AppError::InvalidPath(format!("cannot place {} inside itself", source)));
    }
    Ok(())
}
