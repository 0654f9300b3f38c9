//! Video merging endpoint.

use axum::extract::{Multipart, State};
use axum::Json;
use tracing::info;

use avkit_models::{unique_output_name, MergeMethod, OperationKind, OperationParams};
use avkit_worker::Job;

use crate::error::ApiResult;
use crate::handlers::{run_job, JobResponse};
use crate::metrics;
use crate::state::AppState;

/// `POST /merge-videos`: multipart `files` (two or more), `method`,
/// `output_name`.
pub async fn merge_videos(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<JobResponse>> {
    let upload = state.uploads.admit(multipart, OperationKind::Merge).await?;
    metrics::record_upload(OperationKind::Merge.as_str(), upload.total_bytes);

    let method = match upload.field("method") {
        Some(value) => value.parse::<MergeMethod>()?,
        None => MergeMethod::default(),
    };
    let output_name = unique_output_name(upload.field("output_name"), "merged_video");

    info!(
        files = upload.files.len(),
        method = %method,
        output = %output_name,
        "Merge request admitted"
    );

    let job = Job::new(
        OperationParams::Merge { method },
        upload.files,
        state.worker_config.output_dir.join(output_name),
        state.worker_config.job_timeout,
    )?;

    run_job(&state, job, "Videos merged successfully!").await
}
