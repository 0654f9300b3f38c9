//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use avkit_models::EncodingConfig;

use crate::error::WorkerResult;

/// Default job deadline.
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 300;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Wall-clock deadline of one job
    pub job_timeout: Duration,
    /// Where uploaded inputs are stored until their job finishes
    pub upload_dir: PathBuf,
    /// Where published outputs live until the retention sweep removes them
    pub output_dir: PathBuf,
    /// Whether the retention sweeper runs
    pub retention_enabled: bool,
    /// Files older than this are swept
    pub retention_max_age: Duration,
    /// How often the sweeper runs
    pub retention_interval: Duration,
    /// Output encoding
    pub encoding: EncodingConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            job_timeout: Duration::from_secs(DEFAULT_JOB_TIMEOUT_SECS),
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("output"),
            retention_enabled: true,
            retention_max_age: Duration::from_secs(3600), // 1 hour
            retention_interval: Duration::from_secs(300),
            encoding: EncodingConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut encoding = defaults.encoding.clone();
        if let Ok(preset) = std::env::var("FFMPEG_PRESET") {
            encoding = encoding.with_preset(preset);
        }
        if let Some(crf) = std::env::var("FFMPEG_CRF").ok().and_then(|s| s.parse().ok()) {
            encoding = encoding.with_crf(crf);
        }

        Self {
            job_timeout: Duration::from_secs(
                std::env::var("JOB_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_JOB_TIMEOUT_SECS),
            ),
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            retention_enabled: std::env::var("RETENTION_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            retention_max_age: Duration::from_secs(
                std::env::var("RETENTION_MAX_AGE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
            retention_interval: Duration::from_secs(
                std::env::var("RETENTION_SWEEP_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            encoding,
        }
    }

    /// Create the upload and output directories if missing.
    pub async fn ensure_dirs(&self) -> WorkerResult<()> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.job_timeout, Duration::from_secs(300));
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.retention_max_age, Duration::from_secs(3600));
        assert!(config.retention_enabled);
    }

    #[tokio::test]
    async fn test_ensure_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = WorkerConfig {
            upload_dir: dir.path().join("in"),
            output_dir: dir.path().join("out"),
            ..Default::default()
        };

        config.ensure_dirs().await.unwrap();
        assert!(config.upload_dir.is_dir());
        assert!(config.output_dir.is_dir());
    }
}
