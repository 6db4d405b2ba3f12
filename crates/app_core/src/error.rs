//! Application error types

use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Recoverable Errors (notify user, continue) =====
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Item no longer exists: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Wrong password or corrupted ciphertext; the two are not distinguished
    #[error("Authentication failed: wrong password or corrupted data")]
    Authentication,

    #[error("Operation cancelled")]
    Cancelled,

    // ===== Consistency =====
    #[error("Trash ledger error: {0}")]
    Ledger(String),

    #[error("Database error: {0}")]
    Database(String),

    // ===== Fatal Errors (application termination) =====
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization failed: {0}")]
    Init(String),
}

impl AppError {
    /// Is this error recoverable?
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AppError::Config(_) | AppError::Init(_))
    }

    /// Is this a fatal error?
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Errors the UI should show as an actionable message
    pub fn is_actionable(&self) -> bool {
        matches!(self, AppError::Authentication | AppError::PermissionDenied(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// Get a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AppError::NotFound(path) => format!("{} no longer exists", path),
            AppError::PermissionDenied(_) => {
                "Storage access was denied. Grant file access in system settings.".to_string()
            }
            AppError::Authentication => "Wrong password, or the file is damaged.".to_string(),
            AppError::AlreadyExists(path) => format!("{} already exists", path),
            AppError::Cancelled => "Cancelled".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<app_fs::FsError> for AppError {
    fn from(e: app_fs::FsError) -> Self {
        match e {
            app_fs::FsError::NotFound(p) => AppError::NotFound(p),
            app_fs::FsError::PermissionDenied(p) => AppError::PermissionDenied(p),
            app_fs::FsError::AlreadyExists(p) => AppError::AlreadyExists(p),
            app_fs::FsError::InvalidPath(p) => AppError::InvalidPath(p),
            app_fs::FsError::Io(err) => AppError::Io(err),
            app_fs::FsError::CrossDevice(p) => AppError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("cross-device rename: {}", p),
            )),
        }
    }
}

impl From<app_db::DbError> for AppError {
    fn from(e: app_db::DbError) -> Self {
        AppError::Database(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_error_mapping() {
        let e: AppError = app_fs::FsError::NotFound("a.txt".into()).into();
        assert!(e.is_not_found());

        let e: AppError = app_fs::FsError::PermissionDenied("DCIM".into()).into();
        assert!(e.is_actionable());
    }

    #[test]
    fn test_authentication_message_does_not_leak_cause() {
        let msg = AppError::Authentication.user_message();
        assert!(msg.contains("password"));
        assert!(msg.contains("damaged"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(AppError::Init("db".into()).is_fatal());
        assert!(AppError::Ledger("write".into()).is_recoverable());
    }
}
