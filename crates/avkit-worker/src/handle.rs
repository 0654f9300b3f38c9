//! Input file handles with guaranteed cleanup.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::WorkerResult;

/// A validated input file on disk.
///
/// Owned handles delete their file exactly once: either through
/// [`MediaFileHandle::remove`], which consumes the handle, or on drop.
/// External handles wrap files the process does not own (CLI inputs) and
/// never delete anything.
#[derive(Debug)]
pub struct MediaFileHandle {
    path: PathBuf,
    original_name: Option<String>,
    owned: bool,
    removed: bool,
}

impl MediaFileHandle {
    /// Handle for a file this process created and must clean up.
    pub fn owned(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            original_name: None,
            owned: true,
            removed: false,
        }
    }

    /// Handle for a caller-provided file that must be left alone.
    pub fn external(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            original_name: None,
            owned: false,
            removed: false,
        }
    }

    /// Remember the client-supplied file name.
    pub fn with_original_name(mut self, name: impl Into<String>) -> Self {
        self.original_name = Some(name.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_name(&self) -> Option<&str> {
        self.original_name.as_deref()
    }

    pub fn is_owned(&self) -> bool {
        self.owned
    }

    /// Delete the file now. Returns whether a file was removed.
    pub async fn remove(mut self) -> WorkerResult<bool> {
        self.removed = true;
        if !self.owned {
            return Ok(false);
        }

        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Removed input file");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for MediaFileHandle {
    fn drop(&mut self) {
        if !self.owned || self.removed {
            return;
        }

        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed input file on drop"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove input file on drop"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_remove_owned() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"x").unwrap();

        let handle = MediaFileHandle::owned(&path).with_original_name("clip.mp4");
        assert_eq!(handle.original_name(), Some("clip.mp4"));
        assert!(handle.remove().await.unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_owned() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"x").unwrap();

        drop(MediaFileHandle::owned(&path));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_external_is_never_deleted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("song.wav");
        std::fs::write(&path, b"x").unwrap();

        assert!(!MediaFileHandle::external(&path).remove().await.unwrap());
        drop(MediaFileHandle::external(&path));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_removal_happens_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"x").unwrap();

        let handle = MediaFileHandle::owned(&path);
        assert!(handle.remove().await.unwrap());

        // A new file at the same path must survive the earlier handle
        std::fs::write(&path, b"y").unwrap();
        assert!(path.exists());
    }
}
