//! PocketFiler File System Abstraction Layer
//!
//! Provides the storage-facing half of the file manager:
//! - StorageBackend: primitive async I/O over one hierarchical namespace
//! - LocalBackend: tokio::fs implementation rooted at a device storage root
//! - VirtualNode: the node model handed to the UI layer
//! - Path resolution between virtual identifiers and real relative paths
//! - Name sanitization and directory listing order

mod backend;
mod local;
mod node;
mod resolver;
mod sanitize;
mod browser;

pub use backend::{Capacity, DirEntry, Metadata, StorageBackend};
pub use local::LocalBackend;
pub use node::{FileType, VirtualNode};
pub use resolver::{
    dir_id, file_name, join_path, parent_path, path_trail, ResolvedListing, Sentinels, VirtualId,
    CATEGORY_PREFIX, FAVORITES_ID, INTERNAL_ROOT_ID, RECENT_ID, ROOT_ID, TRASH_ID,
};
pub use sanitize::{is_valid_name, sanitize_name, truncate_name, validate_name, MAX_NAME_BYTES};
pub use browser::{is_hidden_name, sort_nodes, ListOptions, SortBy, SortOrder};

use thiserror::Error;

/// File system errors
#[derive(Error, Debug)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Cross-device rename: {0}")]
    CrossDevice(String),
}

impl FsError {
    /// Classify an I/O error raised while touching `path`
    pub fn from_io(err: std::io::Error, path: &str) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::NotFound => FsError::NotFound(path.to_string()),
            ErrorKind::PermissionDenied => FsError::PermissionDenied(path.to_string()),
            ErrorKind::AlreadyExists => FsError::AlreadyExists(path.to_string()),
            _ if is_cross_device(&err) => FsError::CrossDevice(path.to_string()),
            _ => FsError::Io(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }
}

// Unix: EXDEV = 18, Windows: ERROR_NOT_SAME_DEVICE = 17
fn is_cross_device(err: &std::io::Error) -> bool {
    match err.raw_os_error() {
        Some(18) => cfg!(unix),
        Some(17) => cfg!(windows),
        _ => false,
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
