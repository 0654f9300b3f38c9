//! The media operation seam used by the job executor.

use async_trait::async_trait;
use std::path::PathBuf;

use avkit_models::{EncodingConfig, JobId, OperationParams};

use crate::error::MediaResult;
use crate::gate::PublishGate;
use crate::{merge, synth};

/// Everything an operation needs to produce one output.
#[derive(Debug, Clone)]
pub struct OperationRequest {
    pub job_id: JobId,
    /// Input files in the order they should be processed
    pub inputs: Vec<PathBuf>,
    /// Where the finished output must end up
    pub output_path: PathBuf,
    pub params: OperationParams,
    /// Publish latch shared with the executor
    pub gate: PublishGate,
}

/// A long-running media conversion.
///
/// Implementations must publish the output only through
/// `request.gate`, and return the published path.
#[async_trait]
pub trait MediaOperation: Send + Sync {
    /// Short name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Run the operation to completion.
    async fn execute(&self, request: OperationRequest) -> MediaResult<PathBuf>;
}

/// FFmpeg-backed implementation of every operation kind.
#[derive(Debug, Clone, Default)]
pub struct FfmpegOperation {
    encoding: EncodingConfig,
}

impl FfmpegOperation {
    pub fn new(encoding: EncodingConfig) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> &EncodingConfig {
        &self.encoding
    }
}

#[async_trait]
impl MediaOperation for FfmpegOperation {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn execute(&self, request: OperationRequest) -> MediaResult<PathBuf> {
        match request.params {
            OperationParams::Merge { method } => {
                merge::merge_videos(&request, method, &self.encoding).await
            }
            OperationParams::AudioToVideo(params) => {
                synth::audio_to_video(&request, &params, &self.encoding).await
            }
        }
    }
}
