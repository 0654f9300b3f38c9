//! HTTP handlers.

pub mod convert;
pub mod download;
pub mod formats;
pub mod health;
pub mod merge;

pub use convert::*;
pub use download::*;
pub use formats::*;
pub use health::*;
pub use merge::*;

use axum::Json;
use serde::Serialize;

use avkit_models::JobResult;
use avkit_worker::Job;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Body of a successful conversion.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub success: bool,
    pub message: String,
    pub download_url: String,
    pub filename: String,
}

/// Run `job` to its terminal result and translate it for the client.
pub(crate) async fn run_job(
    state: &AppState,
    job: Job,
    message: &str,
) -> ApiResult<Json<JobResponse>> {
    match state.executor.run(job).await {
        JobResult::Success { output } => {
            let filename = output
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| ApiError::internal("Published output has no file name"))?;

            Ok(Json(JobResponse {
                success: true,
                message: message.to_string(),
                download_url: format!("/download/{}", filename),
                filename,
            }))
        }
        JobResult::Failure { error } => Err(ApiError::OperationFailed(error)),
        JobResult::Timeout { deadline_secs } => Err(ApiError::Timeout(deadline_secs)),
    }
}
