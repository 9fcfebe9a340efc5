//! Page capture collaborators
//!
//! The camera, the gallery picker and the platform's file-reference
//! issuance live outside this crate. They are modelled as traits so an
//! editor can be driven by a real platform or by tests.
//!
//! [`LocalFileProvider`] and [`CaptureSession`] are the filesystem side
//! that does belong here: each editing session gets its own folder for
//! captured pages, and pages are named by position (`0.jpg`, `1.jpg`, ...).

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::{StorageError, StorageResult};

/// Content type filter used when importing pages
pub const IMAGE_CONTENT_TYPE: &str = "image/*";

/// Reference to image content, e.g. `file:///...` or `content://...`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentRef(String);

impl ContentRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ContentRef {
    fn from(reference: String) -> Self {
        Self(reference)
    }
}

impl From<&str> for ContentRef {
    fn from(reference: &str) -> Self {
        Self(reference.to_string())
    }
}

/// Takes a picture into `target`
///
/// Returns the reference of the stored picture, or `None` when the user
/// cancelled or capture failed. Single shot, no retry.
pub trait CaptureService {
    fn capture(&self, target: &ContentRef) -> Option<ContentRef>;
}

/// Lets the user pick existing content matching `content_type`
pub trait ImportService {
    fn import(&self, content_type: &str) -> Option<ContentRef>;
}

/// Turns an application-local path into a reference a capture service can
/// write to
pub trait FileReferenceProvider {
    fn reference_for(&self, path: &Path) -> StorageResult<ContentRef>;
}

/// Issues `file://` references for local paths
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileProvider;

impl FileReferenceProvider for LocalFileProvider {
    fn reference_for(&self, path: &Path) -> StorageResult<ContentRef> {
        if !path.is_absolute() {
            return Err(StorageError::InvalidPath {
                path: path.to_path_buf(),
                details: "path must be absolute".to_string(),
            });
        }

        let path_str = path.to_str().ok_or_else(|| StorageError::InvalidPath {
            path: path.to_path_buf(),
            details: "path is not valid UTF-8".to_string(),
        })?;

        Ok(ContentRef::new(format!("file://{}", path_str)))
    }
}

/// Folder that receives the pages captured during one editing session
#[derive(Debug, Clone)]
pub struct CaptureSession {
    dir: PathBuf,
}

impl CaptureSession {
    /// A fresh session under `captures_dir`; the folder is created lazily
    pub fn new(captures_dir: &Path) -> Self {
        Self {
            dir: captures_dir.join(Uuid::new_v4().to_string()),
        }
    }

    /// Session folder
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for page `index`, creating the session folder if needed
    pub fn page_path(&self, index: usize) -> StorageResult<PathBuf> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| StorageError::create_directory(e, self.dir.clone()))?;
        Ok(self.dir.join(format!("{}.jpg", index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_reference() {
        let reference = LocalFileProvider
            .reference_for(Path::new("/data/captures/s/0.jpg"))
            .unwrap();
        assert_eq!(reference.as_str(), "file:///data/captures/s/0.jpg");
    }

    #[test]
    fn test_relative_path_rejected() {
        let err = LocalFileProvider
            .reference_for(Path::new("captures/0.jpg"))
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath { .. }));
    }

    #[test]
    fn test_sessions_are_distinct() {
        let temp_dir = TempDir::new().unwrap();
        let a = CaptureSession::new(temp_dir.path());
        let b = CaptureSession::new(temp_dir.path());

        assert_ne!(a.dir(), b.dir());
        assert!(!a.dir().exists());
    }

    #[test]
    fn test_page_path_creates_folder() {
        let temp_dir = TempDir::new().unwrap();
        let session = CaptureSession::new(&temp_dir.path().join("captures"));

        let path = session.page_path(2).unwrap();

        assert!(session.dir().is_dir());
        assert_eq!(path, session.dir().join("2.jpg"));
    }

    #[test]
    fn test_content_ref_display() {
        let reference = ContentRef::from("content://media/external/images/7");
        assert_eq!(reference.to_string(), "content://media/external/images/7");
    }
}
