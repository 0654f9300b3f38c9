//! A single conversion request, ready to run.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;

use avkit_models::{JobId, OperationParams};

use crate::error::{WorkerError, WorkerResult};
use crate::handle::MediaFileHandle;

/// One accepted conversion request.
///
/// The job owns its input handles. Dropping a job that never ran removes
/// its owned inputs.
#[derive(Debug)]
pub struct Job {
    pub id: JobId,
    pub params: OperationParams,
    pub inputs: Vec<MediaFileHandle>,
    pub output_path: PathBuf,
    pub deadline: Duration,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Build a job, validating params against the number of inputs.
    pub fn new(
        params: OperationParams,
        inputs: Vec<MediaFileHandle>,
        output_path: impl Into<PathBuf>,
        deadline: Duration,
    ) -> WorkerResult<Self> {
        params.validate(inputs.len())?;

        if deadline.is_zero() {
            return Err(WorkerError::invalid_job("Deadline must be positive"));
        }

        let output_path = output_path.into();
        if output_path.file_name().is_none() {
            return Err(WorkerError::invalid_job(format!(
                "Output path {} has no file name",
                output_path.display()
            )));
        }

        Ok(Self {
            id: JobId::new(),
            params,
            inputs,
            output_path,
            deadline,
            created_at: Utc::now(),
        })
    }

    /// Paths of the inputs, in order.
    pub fn input_paths(&self) -> Vec<PathBuf> {
        self.inputs.iter().map(|h| h.path().to_path_buf()).collect()
    }

    /// Output file name as shown to clients.
    pub fn output_file_name(&self) -> String {
        self.output_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}
