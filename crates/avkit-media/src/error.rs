//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid media file: {0}")]
    InvalidMedia(String),

    #[error("No valid video files found")]
    NoValidInputs,

    #[error("Job was abandoned, output not published")]
    Abandoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an FFprobe failure error.
    pub fn ffprobe_failed(message: impl Into<String>, stderr: Option<String>) -> Self {
        Self::FfprobeFailed {
            message: message.into(),
            stderr,
        }
    }

    /// Create an invalid media error.
    pub fn invalid_media(message: impl Into<String>) -> Self {
        Self::InvalidMedia(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this error is about the input file itself rather than the
    /// toolchain or the host. Only such inputs may be skipped.
    pub fn is_input_fault(&self) -> bool {
        matches!(
            self,
            MediaError::FfprobeFailed { .. }
                | MediaError::InvalidMedia(_)
                | MediaError::JsonParse(_)
                | MediaError::FileNotFound(_)
        )
    }

    /// One-line description including the FFmpeg stderr tail, if any.
    ///
    /// This is what ends up in a failed job result.
    pub fn describe(&self) -> String {
        match self {
            MediaError::FfmpegFailed {
                message,
                stderr: Some(stderr),
                exit_code,
            } if !stderr.trim().is_empty() => {
                let code = exit_code
                    .map(|c| format!(" (exit code {})", c))
                    .unwrap_or_default();
                format!("{}{}: {}", message, code, last_line(stderr))
            }
            MediaError::FfprobeFailed {
                message,
                stderr: Some(stderr),
            } if !stderr.trim().is_empty() => format!("{}: {}", message, last_line(stderr)),
            other => other.to_string(),
        }
    }
}

fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
}
