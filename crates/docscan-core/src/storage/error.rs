//! Storage error handling
//!
//! Provides typed errors for storage operations with descriptive messages
//! and recovery suggestions, so a front end can offer retry or dismiss
//! instead of crashing.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disk is full or quota exceeded
    #[error(
        "Disk full or quota exceeded while writing to '{path}'. Free up disk space and try again."
    )]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A row that was required does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Path cannot be turned into a content reference
    #[error("Invalid path '{path}': {details}")]
    InvalidPath { path: PathBuf, details: String },

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Background database task panicked or was aborted
    #[error("Database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Connection lock poisoned by a panic in another task
    #[error("Database connection is unusable after a panic in another task")]
    Poisoned,
}

impl StorageError {
    /// Create an error for a failed `create_dir_all` on `path`
    ///
    /// Classifies the error based on its kind (permission, disk full, etc.);
    /// anything else is `CreateDirectory`.
    pub fn create_directory(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                path,
                source: error,
            },
            _ if is_disk_full_error(&error) => StorageError::DiskFull {
                path,
                source: error,
            },
            _ => StorageError::CreateDirectory {
                path,
                source: error,
            },
        }
    }

    /// Shorthand for a missing row
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        StorageError::NotFound { entity, id }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors are worth offering a retry for once the user has
    /// acted on the recovery suggestion. SQLite busy/locked and full-disk
    /// conditions fall in this group.
    pub fn is_recoverable(&self) -> bool {
        match self {
            StorageError::DiskFull { .. } | StorageError::PermissionDenied { .. } => true,
            StorageError::Database(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy
                    | rusqlite::ErrorCode::DatabaseLocked
                    | rusqlite::ErrorCode::DiskFull
            ),
            _ => false,
        }
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free up disk space and try again."),
            StorageError::PermissionDenied { .. } => {
                Some("Check file and directory permissions. You may need to run with different permissions or change ownership.")
            }
            StorageError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StorageError::Database(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::DiskFull =>
            {
                Some("Free up disk space and try again.")
            }
            StorageError::Database(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::CannotOpen =>
            {
                Some("Check that the data directory exists and is writable.")
            }
            StorageError::Database(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Some("A referenced document, tag or image no longer exists. Reload and try again.")
            }
            _ => None,
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_classification() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = StorageError::create_directory(io_err, PathBuf::from("/test/path"));

        assert!(matches!(err, StorageError::PermissionDenied { .. }));
        assert!(err.is_recoverable());
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_disk_full_detection() {
        let io_err = io::Error::new(io::ErrorKind::Other, "No space left on device");
        let err = StorageError::create_directory(io_err, PathBuf::from("/full/disk"));

        assert!(matches!(err, StorageError::DiskFull { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_other_io_is_create_directory() {
        let io_err = io::Error::new(io::ErrorKind::InvalidInput, "not a directory");
        let err = StorageError::create_directory(io_err, PathBuf::from("/data"));

        assert!(matches!(err, StorageError::CreateDirectory { .. }));
        assert!(!err.is_recoverable());
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_not_found_display() {
        let err = StorageError::not_found("document", 42);
        assert_eq!(err.to_string(), "document 42 not found");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_busy_database_is_recoverable() {
        let err = StorageError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        ));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = StorageError::PermissionDenied {
            path: PathBuf::from("/test/file"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };

        let msg = err.to_string();
        assert!(msg.contains("Permission denied"));
        assert!(msg.contains("/test/file"));
    }
}
