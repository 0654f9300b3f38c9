//! API routes.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{convert_audio, download_file, formats, health, merge_videos, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    body_limit_rejection, cors_layer, rate_limit_middleware, redact_server_errors, request_id,
    request_logging, security_headers, RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    // Uploads are streamed to disk, so the buffered-body default does not apply.
    // The per-file and per-request ceilings are enforced by the upload gate;
    // declared lengths past the body ceiling are refused before any read.
    let upload_routes = Router::new()
        .route("/merge-videos", post(merge_videos))
        .route("/convert-audio", post(convert_audio))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size()))
        .layer(middleware::from_fn_with_state(
            state.uploads.limits(),
            body_limit_rejection,
        ));

    let file_routes = Router::new()
        .merge(upload_routes)
        .route("/download/:filename", get(download_file))
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let info_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready))
        .route("/formats", get(formats));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(file_routes)
        .merge(info_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            redact_server_errors,
        ))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
