//! Audio to video endpoint.

use std::path::Path;

use axum::extract::{Multipart, State};
use axum::Json;
use tracing::info;

use avkit_models::{
    unique_output_name, OperationKind, OperationParams, Resolution, RgbColor, SynthesisParams,
};
use avkit_models::operation::{DEFAULT_FPS, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use avkit_worker::Job;

use crate::error::ApiResult;
use crate::handlers::{run_job, JobResponse};
use crate::metrics;
use crate::state::AppState;

/// `POST /convert-audio`: multipart `file` plus `resolution_width`,
/// `resolution_height`, `fps`, `color_r`, `color_g`, `color_b` and
/// `output_name`.
pub async fn convert_audio(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<JobResponse>> {
    let upload = state
        .uploads
        .admit(multipart, OperationKind::AudioToVideo)
        .await?;
    metrics::record_upload(OperationKind::AudioToVideo.as_str(), upload.total_bytes);

    let params = SynthesisParams {
        resolution: Resolution::new(
            upload.parse_field("resolution_width", DEFAULT_WIDTH)?,
            upload.parse_field("resolution_height", DEFAULT_HEIGHT)?,
        ),
        fps: upload.parse_field("fps", DEFAULT_FPS)?,
        color: RgbColor::new(
            upload.parse_field("color_r", 0)?,
            upload.parse_field("color_g", 0)?,
            upload.parse_field("color_b", 0)?,
        ),
    };

    let fallback = default_output_stem(upload.files.first().and_then(|f| f.original_name()));
    let output_name = unique_output_name(upload.field("output_name"), &fallback);

    info!(
        width = params.resolution.width,
        height = params.resolution.height,
        fps = params.fps,
        output = %output_name,
        "Audio conversion admitted"
    );

    let job = Job::new(
        OperationParams::AudioToVideo(params),
        upload.files,
        state.worker_config.output_dir.join(output_name),
        state.worker_config.job_timeout,
    )?;

    run_job(&state, job, "Audio converted to video successfully!").await
}

/// `<audio stem>_video`, used when no output name was given.
fn default_output_stem(original_name: Option<&str>) -> String {
    let stem = original_name
        .and_then(|name| Path::new(name).file_stem())
        .map(|s| s.to_string_lossy().replace('.', "_"))
        .unwrap_or_else(|| "audio".to_string());
    format!("{}_video", stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_stem() {
        assert_eq!(default_output_stem(Some("song.mp3")), "song_video");
        assert_eq!(default_output_stem(Some("live.set.wav")), "live_set_video");
        assert_eq!(default_output_stem(None), "audio_video");
    }
}
