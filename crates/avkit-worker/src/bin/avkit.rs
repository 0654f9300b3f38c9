//! Command line front-end: merge videos or turn audio into video.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::warn;

use avkit_media::{probe_media, FfmpegOperation};
use avkit_models::{
    sanitize_filename, JobResult, MediaKind, MergeMethod, OperationParams, Resolution, RgbColor,
    SynthesisParams,
};
use avkit_worker::{init_tracing, BoundedExecutor, Job, MediaFileHandle, WorkerConfig};

#[derive(Parser)]
#[command(name = "avkit")]
#[command(version)]
#[command(about = "Merge videos and convert audio files to video")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge multiple videos into a single video file
    Merge {
        /// Video files to merge, in order
        #[arg(required = true)]
        videos: Vec<PathBuf>,

        /// Output video filename
        #[arg(short, long, default_value = "merged_video.mp4")]
        output: String,

        /// concatenate (sequential) or overlay (picture-in-picture)
        #[arg(short, long, default_value = "concatenate")]
        method: MergeMethod,

        /// Output directory
        #[arg(short = 'd', long, env = "OUTPUT_DIR", default_value = "output")]
        output_dir: PathBuf,

        /// Job deadline in seconds
        #[arg(long, env = "JOB_TIMEOUT_SECS", default_value_t = 300)]
        timeout: u64,
    },

    /// Convert audio-only files to video with a solid background
    AudioToVideo {
        /// Audio files to convert
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output video filename (single file only)
        #[arg(short, long)]
        output: Option<String>,

        /// Video resolution
        #[arg(short, long, num_args = 2, value_names = ["WIDTH", "HEIGHT"], default_values_t = [1920, 1080])]
        resolution: Vec<u32>,

        /// Frames per second
        #[arg(short, long, default_value_t = 30)]
        fps: u32,

        /// Background color RGB values
        #[arg(short, long, num_args = 3, value_names = ["R", "G", "B"], default_values_t = [0, 0, 0])]
        color: Vec<u8>,

        /// Output directory
        #[arg(short = 'd', long, env = "OUTPUT_DIR", default_value = "output")]
        output_dir: PathBuf,

        /// Convert every file separately, even if only one is given
        #[arg(long, default_value_t = false)]
        batch: bool,

        /// Job deadline in seconds, per file
        #[arg(long, env = "JOB_TIMEOUT_SECS", default_value_t = 300)]
        timeout: u64,
    },

    /// Show duration, resolution, frame rate and size of media files
    Info {
        /// Files to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List supported input formats
    Formats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = WorkerConfig::from_env();
    let executor = BoundedExecutor::new(Arc::new(FfmpegOperation::new(config.encoding.clone())));

    match cli.command {
        Commands::Merge {
            videos,
            output,
            method,
            output_dir,
            timeout,
        } => {
            let valid = existing_inputs(&videos, MediaKind::Video);
            if valid.is_empty() {
                bail!("No valid video files provided");
            }

            tokio::fs::create_dir_all(&output_dir).await?;
            let output_path = output_dir.join(cli_output_name(Some(&output), "merged_video"));

            println!("Merging {} videos using {} method...", valid.len(), method);
            let job = Job::new(
                OperationParams::Merge { method },
                valid.into_iter().map(MediaFileHandle::external).collect(),
                output_path,
                Duration::from_secs(timeout),
            )?;

            let output = expect_success(executor.run(job).await)
                .context("Video merging failed")?;
            println!("Output file: {}", output.display());
        }

        Commands::AudioToVideo {
            files,
            output,
            resolution,
            fps,
            color,
            output_dir,
            batch,
            timeout,
        } => {
            let params = SynthesisParams {
                resolution: Resolution::new(resolution[0], resolution[1]),
                fps,
                color: RgbColor::new(color[0], color[1], color[2]),
            };
            params.validate()?;

            let valid = existing_inputs(&files, MediaKind::Audio);
            if valid.is_empty() {
                bail!("No valid audio files provided");
            }

            tokio::fs::create_dir_all(&output_dir).await?;
            let deadline = Duration::from_secs(timeout);

            if batch || valid.len() > 1 {
                if output.is_some() {
                    warn!("--output is ignored when converting several files");
                }

                println!("Converting {} audio files to video...", valid.len());
                let mut converted = Vec::new();
                for audio in valid {
                    let output_path =
                        output_dir.join(cli_output_name(None, &default_video_stem(&audio)));
                    let job = Job::new(
                        OperationParams::AudioToVideo(params),
                        vec![MediaFileHandle::external(&audio)],
                        output_path,
                        deadline,
                    )?;

                    match expect_success(executor.run(job).await) {
                        Ok(path) => converted.push(path),
                        Err(e) => eprintln!("Failed to convert {}: {}", audio.display(), e),
                    }
                }

                if converted.is_empty() {
                    bail!("No files were converted successfully");
                }
                println!("Successfully converted {} files:", converted.len());
                for path in converted {
                    println!("  {}", path.display());
                }
            } else {
                let audio = &valid[0];
                let output_path = output_dir.join(cli_output_name(
                    output.as_deref(),
                    &default_video_stem(audio),
                ));

                println!("Converting audio to video...");
                let job = Job::new(
                    OperationParams::AudioToVideo(params),
                    vec![MediaFileHandle::external(audio)],
                    output_path,
                    deadline,
                )?;

                let output = expect_success(executor.run(job).await)
                    .context("Audio to video conversion failed")?;
                println!("Output file: {}", output.display());
            }
        }

        Commands::Info { files } => {
            let mut failed = 0;
            for path in &files {
                match probe_media(path).await {
                    Ok(info) => {
                        println!("{}:", path.display());
                        for (label, value) in info.summary() {
                            println!("  {}: {}", label, value);
                        }
                    }
                    Err(e) => {
                        failed += 1;
                        eprintln!("Failed to read {}: {}", path.display(), e.describe());
                    }
                }
            }
            if failed == files.len() {
                bail!("No readable media files provided");
            }
        }

        Commands::Formats => {
            for kind in [MediaKind::Video, MediaKind::Audio] {
                println!("Supported {} formats:", kind);
                for ext in kind.extensions() {
                    println!("  .{}", ext);
                }
            }
        }
    }

    Ok(())
}

/// Keep the paths that exist and carry an allowed extension.
fn existing_inputs(paths: &[PathBuf], kind: MediaKind) -> Vec<PathBuf> {
    paths
        .iter()
        .filter(|path| {
            if !path.is_file() {
                warn!("{} file not found: {}", kind, path.display());
                return false;
            }
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            if !kind.allows(&name) {
                warn!("Unsupported {} format: {}", kind, path.display());
                return false;
            }
            true
        })
        .cloned()
        .collect()
}

/// `<stem>_video`, the default output stem for an audio file.
fn default_video_stem(audio: &Path) -> String {
    let stem = audio
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "audio".to_string());
    format!("{}_video", stem)
}

/// Sanitized `<stem>.mp4`. The CLI writes exactly the requested name.
fn cli_output_name(requested: Option<&str>, fallback_stem: &str) -> String {
    let name = requested
        .and_then(sanitize_filename)
        .or_else(|| sanitize_filename(fallback_stem))
        .unwrap_or_else(|| "output".to_string());

    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name,
    };
    format!("{}.mp4", stem)
}

fn expect_success(result: JobResult) -> anyhow::Result<PathBuf> {
    match result {
        JobResult::Success { output } => Ok(output),
        JobResult::Failure { error } => bail!(error),
        JobResult::Timeout { deadline_secs } => {
            bail!("timed out after {} seconds", deadline_secs)
        }
    }
}
