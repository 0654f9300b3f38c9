//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use avkit_models::ParamError;
use avkit_worker::WorkerError;

use crate::upload::UploadRejection;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("{0}")]
    OperationFailed(String),

    #[error("Processing timed out after {0} seconds")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn operation_failed(msg: impl Into<String>) -> Self {
        Self::OperationFailed(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::OperationFailed(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl From<UploadRejection> for ApiError {
    fn from(rejection: UploadRejection) -> Self {
        match rejection {
            UploadRejection::Io(e) => ApiError::internal(format!("Failed to store upload: {}", e)),
            other => ApiError::Validation(other.to_string()),
        }
    }
}

impl From<ParamError> for ApiError {
    fn from(e: ParamError) -> Self {
        ApiError::Validation(e.to_string())
    }
}

impl From<WorkerError> for ApiError {
    fn from(e: WorkerError) -> Self {
        if e.is_validation() {
            ApiError::Validation(e.to_string())
        } else {
            ApiError::Internal(e.to_string())
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Marks a response whose message carries server-side failure detail.
#[derive(Debug, Clone, Copy)]
pub struct ServerErrorDetail;

/// Generic body used in place of server-side detail in production.
pub const REDACTED_ERROR: &str = "An internal error occurred";

pub(crate) fn error_body(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detailed = matches!(self, ApiError::Internal(_) | ApiError::OperationFailed(_));

        let mut response = error_body(status, self.to_string());
        if detailed {
            response.extensions_mut().insert(ServerErrorDetail);
        }
        response
    }
}
