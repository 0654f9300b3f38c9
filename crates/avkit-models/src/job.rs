//! Job identifiers and terminal job outcomes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, used in log lines and scratch directory names.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(8);
        &self.0[..end]
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Terminal outcome of one job.
///
/// Exactly one variant is produced per job. `Timeout` is kept distinct from
/// `Failure` so callers can tell "probably retryable with smaller input"
/// from "definitely broken input".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobResult {
    /// The operation finished and published its output.
    Success { output: PathBuf },
    /// The operation reported an error (or its task panicked).
    Failure { error: String },
    /// The deadline elapsed before the operation finished.
    Timeout { deadline_secs: u64 },
}

impl JobResult {
    pub fn success(output: impl Into<PathBuf>) -> Self {
        Self::Success {
            output: output.into(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    pub fn timeout(deadline_secs: u64) -> Self {
        Self::Timeout { deadline_secs }
    }

    /// Label used for metrics and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobResult::Success { .. } => "success",
            JobResult::Failure { .. } => "failure",
            JobResult::Timeout { .. } => "timeout",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobResult::Success { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, JobResult::Timeout { .. })
    }

    /// Output path, only for successful jobs.
    pub fn output(&self) -> Option<&Path> {
        match self {
            JobResult::Success { output } => Some(output.as_path()),
            _ => None,
        }
    }
}

impl fmt::Display for JobResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobResult::Success { output } => write!(f, "success ({})", output.display()),
            JobResult::Failure { error } => write!(f, "failure: {}", error),
            JobResult::Timeout { deadline_secs } => {
                write!(f, "timed out after {} seconds", deadline_secs)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_short() {
        let id = JobId::from_string("0123456789abcdef");
        assert_eq!(id.short(), "01234567");

        let tiny = JobId::from_string("abc");
        assert_eq!(tiny.short(), "abc");
    }

    #[test]
    fn test_job_result_accessors() {
        let ok = JobResult::success("/out/video.mp4");
        assert!(ok.is_success());
        assert_eq!(ok.output(), Some(Path::new("/out/video.mp4")));

        let timeout = JobResult::timeout(300);
        assert!(timeout.is_timeout());
        assert!(timeout.output().is_none());
        assert_eq!(timeout.as_str(), "timeout");
    }

    #[test]
    fn test_job_result_serialization() {
        let failure = JobResult::failure("No valid video files found");
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["error"], "No valid video files found");

        let back: JobResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, failure);
    }
}
