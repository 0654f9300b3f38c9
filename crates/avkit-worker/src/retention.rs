//! Age-based cleanup of the upload and output directories.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::time::interval;
use tracing::{debug, error, info, warn};

use avkit_models::format_bytes;

use crate::config::WorkerConfig;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Regular files looked at
    pub scanned: u64,
    /// Files removed
    pub removed: u64,
    /// Bytes freed
    pub bytes_removed: u64,
    /// Files or directories that could not be processed
    pub errors: u64,
}

/// Periodically removes files older than the retention age.
///
/// Only regular files directly inside the configured directories are
/// considered. Subdirectories (such as in-progress scratch directories)
/// are left alone.
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    dirs: Vec<PathBuf>,
    max_age: Duration,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(dirs: Vec<PathBuf>, max_age: Duration, interval: Duration) -> Self {
        Self {
            dirs,
            max_age,
            interval,
        }
    }

    /// Sweeper over the upload and output directories of `config`.
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(
            vec![config.upload_dir.clone(), config.output_dir.clone()],
            config.retention_max_age,
            config.retention_interval,
        )
    }

    /// Start the background sweep loop.
    ///
    /// This function runs indefinitely and should be spawned as a background task.
    pub async fn run(self) {
        info!(
            "Starting retention sweeper (interval: {:?}, max age: {:?})",
            self.interval, self.max_age
        );

        let mut ticker = interval(self.interval);

        loop {
            ticker.tick().await;

            let report = self.sweep_once().await;
            if report.removed > 0 || report.errors > 0 {
                info!(
                    removed = report.removed,
                    errors = report.errors,
                    "Retention sweep freed {}",
                    format_bytes(report.bytes_removed)
                );
            }
        }
    }

    /// Run a single sweep over every directory.
    pub async fn sweep_once(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let now = SystemTime::now();

        for dir in &self.dirs {
            self.sweep_dir(dir, now, &mut report).await;
        }

        metrics::counter!("avkit_retention_files_removed_total").increment(report.removed);
        report
    }

    async fn sweep_dir(&self, dir: &Path, now: SystemTime, report: &mut SweepReport) {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                error!(dir = %dir.display(), error = %e, "Failed to read directory");
                report.errors += 1;
                return;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Failed to read directory entry");
                    report.errors += 1;
                    break;
                }
            };

            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to stat file");
                    report.errors += 1;
                    continue;
                }
            };
            report.scanned += 1;

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age <= self.max_age {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), age_secs = age.as_secs(), "Removed old file");
                    report.removed += 1;
                    report.bytes_removed += metadata.len();
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove old file");
                    report.errors += 1;
                }
            }
        }
    }
}
