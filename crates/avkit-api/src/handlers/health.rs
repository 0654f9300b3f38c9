//! Health check handlers.

use std::path::Path;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use avkit_media::{check_ffmpeg, check_ffprobe};
use avkit_models::utils::short_token;
use avkit_worker::ExecutorSnapshot;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub uptime_secs: u64,
    pub jobs: ExecutorSnapshot,
    pub storage: StorageStats,
}

#[derive(Serialize)]
pub struct StorageStats {
    pub uploads: DirStats,
    pub output: DirStats,
}

/// Regular files directly inside a directory.
#[derive(Debug, Default, Serialize)]
pub struct DirStats {
    pub files: u64,
    pub bytes: u64,
}

/// Health check endpoint (liveness probe).
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        jobs: state.executor.stats(),
        storage: StorageStats {
            uploads: dir_stats(&state.worker_config.upload_dir).await,
            output: dir_stats(&state.worker_config.output_dir).await,
        },
    })
}

/// Count regular files and their bytes. Unreadable directories count as empty.
pub async fn dir_stats(dir: &Path) -> DirStats {
    let mut stats = DirStats::default();
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return stats;
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        if let Ok(metadata) = entry.metadata().await {
            if metadata.is_file() {
                stats.files += 1;
                stats.bytes += metadata.len();
            }
        }
    }
    stats
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub ffmpeg: CheckStatus,
    pub ffprobe: CheckStatus,
    pub upload_dir: CheckStatus,
    pub output_dir: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn ok(latency_ms: u64) -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
            latency_ms: Some(latency_ms),
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(msg.into()),
            latency_ms: None,
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Readiness check endpoint (readiness probe).
/// Checks that FFmpeg and FFprobe are installed and both directories are writable.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let ffmpeg = {
        let start = Instant::now();
        match check_ffmpeg() {
            Ok(_) => CheckStatus::ok(start.elapsed().as_millis() as u64),
            Err(e) => CheckStatus::error(e.to_string()),
        }
    };

    let ffprobe = {
        let start = Instant::now();
        match check_ffprobe() {
            Ok(_) => CheckStatus::ok(start.elapsed().as_millis() as u64),
            Err(e) => CheckStatus::error(e.to_string()),
        }
    };

    let upload_dir = check_writable(&state.worker_config.upload_dir).await;
    let output_dir = check_writable(&state.worker_config.output_dir).await;

    let all_ok = ffmpeg.is_ok() && ffprobe.is_ok() && upload_dir.is_ok() && output_dir.is_ok();

    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks: ReadinessChecks {
            ffmpeg,
            ffprobe,
            upload_dir,
            output_dir,
        },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

async fn check_writable(dir: &Path) -> CheckStatus {
    let start = Instant::now();
    let probe = dir.join(format!(".avkit-ready-{}", short_token()));

    if let Err(e) = tokio::fs::write(&probe, b"ok").await {
        return CheckStatus::error(format!("{} is not writable: {}", dir.display(), e));
    }
    let _ = tokio::fs::remove_file(&probe).await;
    CheckStatus::ok(start.elapsed().as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_dir_stats_counts_regular_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"1234").unwrap();
        std::fs::write(dir.path().join("b.mp4"), b"12").unwrap();
        std::fs::create_dir(dir.path().join("scratch")).unwrap();

        let stats = dir_stats(dir.path()).await;
        assert_eq!(stats.files, 2);
        assert_eq!(stats.bytes, 6);
    }

    #[tokio::test]
    async fn test_dir_stats_missing_dir() {
        let dir = TempDir::new().unwrap();
        let stats = dir_stats(&dir.path().join("missing")).await;
        assert_eq!(stats.files, 0);
        assert_eq!(stats.bytes, 0);
    }

    #[tokio::test]
    async fn test_check_writable() {
        let dir = TempDir::new().unwrap();
        assert!(check_writable(dir.path()).await.is_ok());
        assert!(!check_writable(&dir.path().join("missing")).await.is_ok());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
