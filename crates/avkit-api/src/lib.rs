//! Axum HTTP API server for avkit.
//!
//! This crate provides:
//! - Multipart upload admission with streaming size limits
//! - Merge and audio-to-video endpoints backed by the bounded executor
//! - Downloads of published outputs
//! - Rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod upload;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
pub use upload::{AdmittedUpload, UploadGate, UploadLimits, UploadRejection};
