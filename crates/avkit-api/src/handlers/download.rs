//! Download of published outputs.

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderValue};
use axum::response::Response;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::debug;

use avkit_models::sanitize_filename;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `GET /download/:filename`: stream an output file as an attachment.
///
/// Only plain file names that survive sanitization unchanged are served,
/// so nothing outside the output directory is reachable.
pub async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    request: Request,
) -> ApiResult<Response> {
    if sanitize_filename(&filename).as_deref() != Some(filename.as_str()) {
        debug!(filename = %filename, "Rejected download name");
        return Err(ApiError::not_found("File not found"));
    }

    let path = state.worker_config.output_dir.join(&filename);
    let is_file = tokio::fs::metadata(&path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(ApiError::not_found("File not found"));
    }

    let response = ServeFile::new(&path)
        .oneshot(request)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to read {}: {}", filename, e)))?;

    let mut response = response.map(Body::new);
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| ApiError::internal(format!("Invalid header value: {}", e)))?;
    response
        .headers_mut()
        .insert(header::CONTENT_DISPOSITION, disposition);

    Ok(response)
}
