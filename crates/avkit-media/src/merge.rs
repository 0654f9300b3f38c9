//! Merging several videos into one.

use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use avkit_models::{EncodingConfig, MergeMethod};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{concat_filter, overlay_filter, ConcatLayout, ConcatSegment, MAX_OVERLAYS};
use crate::fs_utils::scratch_dir_for;
use crate::operation::OperationRequest;
use crate::probe::{probe_video, MediaInfo};
use crate::progress::progress_logger;

/// A probed input that will take part in the merge.
#[derive(Debug, Clone)]
pub struct ValidInput {
    pub path: PathBuf,
    pub info: MediaInfo,
}

/// Probe inputs in order, dropping the ones that cannot be decoded.
///
/// A missing ffprobe or a host failure aborts instead of skipping.
pub async fn probe_inputs(inputs: &[PathBuf]) -> MediaResult<Vec<ValidInput>> {
    probe_inputs_with(inputs, |path| probe_video(path)).await
}

async fn probe_inputs_with<F, Fut>(inputs: &[PathBuf], probe: F) -> MediaResult<Vec<ValidInput>>
where
    F: Fn(PathBuf) -> Fut,
    Fut: Future<Output = MediaResult<MediaInfo>>,
{
    let mut valid = Vec::with_capacity(inputs.len());

    for path in inputs {
        match probe(path.clone()).await {
            Ok(info) => {
                info!(
                    path = %path.display(),
                    duration = info.duration,
                    "Loaded video"
                );
                valid.push(ValidInput {
                    path: path.clone(),
                    info,
                });
            }
            Err(e) if e.is_input_fault() => {
                warn!(path = %path.display(), error = %e, "Skipping invalid video");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(valid)
}

/// Merge the request inputs with `method` and publish the result.
pub async fn merge_videos(
    request: &OperationRequest,
    method: MergeMethod,
    encoding: &EncodingConfig,
) -> MediaResult<PathBuf> {
    let valid = probe_inputs(&request.inputs).await?;
    if valid.is_empty() {
        return Err(MediaError::NoValidInputs);
    }
    if method == MergeMethod::Overlay && valid.len() < 2 {
        return Err(MediaError::invalid_media(
            "Overlay requires at least 2 valid videos",
        ));
    }
    request.gate.ensure_open()?;

    let scratch = scratch_dir_for(&request.output_path, request.job_id.short())?;
    let scratch_output = scratch.path().join(output_file_name(&request.output_path));

    let (cmd, expected_secs) = match method {
        MergeMethod::Concatenate => (
            concatenate_command(&valid, &scratch_output, encoding),
            valid.iter().map(|v| v.info.duration).sum::<f64>(),
        ),
        MergeMethod::Overlay => (
            overlay_command(&valid, &scratch_output, encoding),
            valid[0].info.duration,
        ),
    };

    info!(
        job_id = %request.job_id,
        method = %method,
        inputs = valid.len(),
        "Merging videos"
    );
    let label = format!("merge_{}", method);
    FfmpegRunner::new()
        .with_label(label.clone())
        .run_with_progress(&cmd, progress_logger(label, expected_secs))
        .await?;

    request.gate.publish(&scratch_output, &request.output_path).await
}

fn output_file_name(output: &Path) -> &std::ffi::OsStr {
    output
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("output.mp4"))
}

/// Single-encode concatenation of every valid input, in order.
pub fn concatenate_command(
    valid: &[ValidInput],
    output: &Path,
    encoding: &EncodingConfig,
) -> FfmpegCommand {
    let layout = ConcatLayout::from_inputs(valid.iter().map(|v| &v.info));
    let segments: Vec<ConcatSegment> = valid
        .iter()
        .enumerate()
        .map(|(input_index, v)| ConcatSegment {
            input_index,
            duration: v.info.duration,
            has_audio: v.info.has_audio(),
        })
        .collect();
    let graph = concat_filter(&segments, &layout);

    let mut cmd = valid
        .iter()
        .fold(FfmpegCommand::new(output), |cmd, v| cmd.input(&v.path))
        .filter_complex(graph.graph)
        .map(graph.video_out);

    if let Some(audio) = graph.audio_out {
        cmd = cmd
            .map(audio)
            .audio_codec(&encoding.audio_codec)
            .audio_bitrate(&encoding.audio_bitrate);
    }

    encode_video(cmd, encoding)
}

/// Picture-in-picture with the first valid input as the base.
pub fn overlay_command(
    valid: &[ValidInput],
    output: &Path,
    encoding: &EncodingConfig,
) -> FfmpegCommand {
    let base = &valid[0];
    let overlays = &valid[1..];

    if overlays.len() > MAX_OVERLAYS {
        warn!(
            accepted = MAX_OVERLAYS,
            ignored = overlays.len() - MAX_OVERLAYS,
            "Too many overlay clips, extra clips are not composited"
        );
    }

    let (width, height) = base
        .info
        .video
        .as_ref()
        .map(|v| (v.width, v.height))
        .unwrap_or((0, 0));
    let used = &overlays[..overlays.len().min(MAX_OVERLAYS)];
    let graph = overlay_filter(width, height, used.len());

    let mut cmd = std::iter::once(base)
        .chain(used.iter())
        .fold(FfmpegCommand::new(output), |cmd, v| cmd.input(&v.path))
        .filter_complex(graph.graph)
        .map(graph.video_out);

    if base.info.has_audio() {
        cmd = cmd
            .map("0:a:0")
            .audio_codec(&encoding.audio_codec)
            .audio_bitrate(&encoding.audio_bitrate);
    }

    encode_video(cmd, encoding).duration(base.info.duration)
}

fn encode_video(cmd: FfmpegCommand, encoding: &EncodingConfig) -> FfmpegCommand {
    cmd.video_codec(&encoding.codec)
        .preset(&encoding.preset)
        .crf(encoding.crf)
        .pixel_format(&encoding.pixel_format)
        .faststart()
}
