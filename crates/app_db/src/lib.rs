//! PocketFiler Database Layer
//!
//! A small SQLite-backed key-value store for façade state that lives
//! outside the storage tree (favorites and similar preference sets).

mod kv;
mod pool;
mod schema;

pub use kv::KvStore;
pub use pool::{init_pool, DbPool};
pub use schema::migrate;

use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Get the database directory
pub fn db_dir() -> PathBuf {
    ProjectDirs::from("com", "PocketFiler", "PocketFiler")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
}

/// Open (and migrate) the preference store in `dir`
pub fn open(dir: &Path) -> Result<KvStore> {
    std::fs::create_dir_all(dir)?;

    let pool = init_pool(&dir.join("prefs.db"))?;
    migrate(&pool)?;

    tracing::info!("Preference store initialized at {:?}", dir);
    Ok(KvStore::new(pool))
}

/// Open the preference store in the default data directory
pub fn init() -> Result<KvStore> {
    open(&db_dir())
}
