//! Shared data models for the avkit backend.
//!
//! This crate provides Serde-serializable types for:
//! - Job identifiers and job outcomes
//! - Merge methods and audio-to-video synthesis parameters
//! - Media kinds and their extension allow-lists
//! - Encoding configuration
//! - Filename sanitization and output naming

pub mod encoding;
pub mod job;
pub mod media_kind;
pub mod operation;
pub mod utils;

// Re-export common types
pub use encoding::EncodingConfig;
pub use job::{JobId, JobResult};
pub use media_kind::MediaKind;
pub use operation::{
    MergeMethod, OperationKind, OperationParams, ParamError, Resolution, RgbColor,
    SynthesisParams,
};
pub use utils::{format_bytes, sanitize_filename, unique_output_name, unique_upload_name};
