//! Audio-to-video synthesis: a solid-color video track muxed with audio.

use std::path::{Path, PathBuf};
use tracing::info;

use avkit_models::{EncodingConfig, SynthesisParams};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::color_source;
use crate::fs_utils::scratch_dir_for;
use crate::operation::OperationRequest;
use crate::probe::probe_audio;
use crate::progress::progress_logger;

/// Synthesize a video for the request's single audio input and publish it.
pub async fn audio_to_video(
    request: &OperationRequest,
    params: &SynthesisParams,
    encoding: &EncodingConfig,
) -> MediaResult<PathBuf> {
    let audio_path = request
        .inputs
        .first()
        .ok_or_else(|| MediaError::invalid_media("No audio file given"))?;

    let info = probe_audio(audio_path).await?;
    info!(
        job_id = %request.job_id,
        path = %audio_path.display(),
        duration = info.duration,
        "Loaded audio"
    );
    request.gate.ensure_open()?;

    let scratch = scratch_dir_for(&request.output_path, request.job_id.short())?;
    let scratch_output = scratch.path().join(
        request
            .output_path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("output.mp4")),
    );

    let cmd = synthesis_command(audio_path, &scratch_output, params, info.duration, encoding);

    info!(
        job_id = %request.job_id,
        resolution = %params.resolution,
        fps = params.fps,
        "Synthesizing video from audio"
    );
    FfmpegRunner::new()
        .with_label("audio_to_video")
        .run_with_progress(&cmd, progress_logger("audio_to_video", info.duration))
        .await?;

    request.gate.publish(&scratch_output, &request.output_path).await
}

/// Color source as input 0, the audio file as input 1, cut to the audio
/// duration.
pub fn synthesis_command(
    audio: &Path,
    output: &Path,
    params: &SynthesisParams,
    duration: f64,
    encoding: &EncodingConfig,
) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .lavfi(color_source(params))
        .input(audio)
        .map("0:v:0")
        .map("1:a:0")
        .video_codec(&encoding.codec)
        .preset(&encoding.preset)
        .tune("stillimage")
        .crf(encoding.crf)
        .pixel_format(&encoding.pixel_format)
        .frame_rate(params.fps)
        .audio_codec(&encoding.audio_codec)
        .audio_bitrate(&encoding.audio_bitrate)
        .duration(duration)
        .bitexact()
        .faststart()
}
