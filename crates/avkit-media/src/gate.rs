//! Per-job publish latch.
//!
//! A finished operation moves its scratch file to the final output path
//! through a [`PublishGate`]. Once the job is abandoned (its deadline
//! passed) the gate refuses to publish, so a late completion can never
//! surface a file the caller was told does not exist.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{MediaError, MediaResult};
use crate::fs_utils::move_file;

#[derive(Debug, Default)]
struct GateInner {
    abandoned: AtomicBool,
    publish_lock: Mutex<()>,
}

/// Cloneable handle to one job's publish latch.
#[derive(Debug, Clone, Default)]
pub struct PublishGate {
    inner: Arc<GateInner>,
}

impl PublishGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the job has been abandoned.
    pub fn is_abandoned(&self) -> bool {
        self.inner.abandoned.load(Ordering::SeqCst)
    }

    /// Fail fast with [`MediaError::Abandoned`] if the job was abandoned.
    ///
    /// Operations call this between steps to skip work nobody will use.
    pub fn ensure_open(&self) -> MediaResult<()> {
        if self.is_abandoned() {
            Err(MediaError::Abandoned)
        } else {
            Ok(())
        }
    }

    /// Move `scratch` to `dest` unless the job was abandoned.
    pub async fn publish(&self, scratch: &Path, dest: &Path) -> MediaResult<PathBuf> {
        let _guard = self.inner.publish_lock.lock().await;
        self.ensure_open()?;
        move_file(scratch, dest).await?;
        Ok(dest.to_path_buf())
    }

    /// Close the gate and wait for any publish already in progress.
    ///
    /// After this returns, the final output path is either untouched for
    /// good or was written by a publish that finished first. Either way the
    /// caller may remove it without racing a later write.
    pub async fn abandon(&self) {
        self.inner.abandoned.store(true, Ordering::SeqCst);
        let _guard = self.inner.publish_lock.lock().await;
    }

    /// Close the gate without waiting. Usable from `Drop`.
    pub fn abandon_now(&self) {
        self.inner.abandoned.store(true, Ordering::SeqCst);
    }
}
