//! PocketFiler Core Domain Logic
//!
//! This crate contains:
//! - The virtual filesystem façade
//! - Trash ledger
//! - Password-based file encryption
//! - Bounded search and storage analysis
//! - Favorites
//! - Configuration and error types

pub mod state;
pub mod config;
pub mod error;
pub mod batch;
pub mod bookmarks;
pub mod crypto;
pub mod facade;
pub mod ledger;
pub mod walker;

pub use state::AppState;
pub use config::{
    AnalysisConfig, AppConfig, CryptoConfig, GeneralConfig, RecentConfig, SearchConfig,
    TrashConfig, VaultConfig,
};
pub use error::{AppError, Result};
pub use batch::{BatchFailure, BatchOutcome};
pub use bookmarks::BookmarkStore;
pub use crypto::{CryptoError, PasswordCipher};
pub use facade::Filer;
pub use ledger::{TrashEntry, TrashLedger};
pub use walker::{AnalysisResult, FolderUsage, LargeFileWindow, SearchOptions, TreeWalker, WalkLimits};
