#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for media conversion.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with any number of inputs
//! - Progress parsing from `-progress pipe:2`
//! - FFprobe media inspection
//! - Filter graphs for concatenation, picture-in-picture overlay and
//!   solid-color synthesis
//! - The [`MediaOperation`] trait and its FFmpeg implementation
//! - [`PublishGate`], which keeps abandoned jobs from publishing output

pub mod command;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod gate;
pub mod merge;
pub mod operation;
pub mod probe;
pub mod progress;
pub mod synth;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{move_file, remove_if_exists};
pub use gate::PublishGate;
pub use operation::{FfmpegOperation, MediaOperation, OperationRequest};
pub use probe::{probe_audio, probe_media, probe_video, MediaInfo};
pub use progress::{progress_logger, FfmpegProgress};
