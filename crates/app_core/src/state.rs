//! Application state management

use crate::{AppConfig, AppError, BookmarkStore, Filer};
use app_db::KvStore;
use app_fs::{LocalBackend, StorageBackend};
use parking_lot::RwLock;
use std::sync::Arc;

/// Main application state. Built once at startup and passed by reference.
pub struct AppState {
    /// Application configuration
    pub config: RwLock<AppConfig>,

    /// Virtual filesystem façade
    pub filer: Filer,
}

impl AppState {
    /// Create the state over the configured storage root and the default
    /// preference store
    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        let root = &config.general.storage_root;
        std::fs::create_dir_all(root)
            .map_err(|e| AppError::Init(format!("storage root {:?}: {}", root, e)))?;

        let kv = app_db::init().map_err(|e| AppError::Init(e.to_string()))?;
        let backend: Arc<dyn StorageBackend> = Arc::new(LocalBackend::new(root));

        tracing::info!("Storage root: {:?}", root);
        Self::with_parts(config, backend, kv)
    }

    /// Create the state from explicit collaborators
    pub fn with_parts(config: AppConfig, backend: Arc<dyn StorageBackend>, kv: KvStore) -> Result<Self, AppError> {
        let bookmarks = BookmarkStore::open(kv)?;
        let filer = Filer::new(backend, bookmarks, &config);

        Ok(Self {
            config: RwLock::new(config),
            filer,
        })
    }

    /// Save the current configuration, including listing preferences
    pub fn save_config(&self) -> anyhow::Result<()> {
        let mut config = self.config.write();
        config.listing = self.filer.list_options();
        config.save()
    }
}
