//! Application state.

use std::sync::Arc;
use std::time::Instant;

use avkit_media::{FfmpegOperation, MediaOperation};
use avkit_worker::{BoundedExecutor, WorkerConfig};

use crate::config::ApiConfig;
use crate::upload::{UploadGate, UploadLimits};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub worker_config: Arc<WorkerConfig>,
    pub executor: BoundedExecutor,
    pub uploads: UploadGate,
    pub started_at: Instant,
}

impl AppState {
    /// State backed by the FFmpeg operation.
    pub fn new(config: ApiConfig, worker_config: WorkerConfig) -> Self {
        let operation = Arc::new(FfmpegOperation::new(worker_config.encoding.clone()));
        Self::with_operation(config, worker_config, operation)
    }

    /// State running jobs through `operation`.
    pub fn with_operation(
        config: ApiConfig,
        worker_config: WorkerConfig,
        operation: Arc<dyn MediaOperation>,
    ) -> Self {
        let uploads = UploadGate::new(
            worker_config.upload_dir.clone(),
            UploadLimits {
                max_file_size: config.max_file_size,
                max_total_size: config.max_total_size,
            },
        );

        Self {
            config,
            worker_config: Arc::new(worker_config),
            executor: BoundedExecutor::new(operation),
            uploads,
            started_at: Instant::now(),
        }
    }
}
