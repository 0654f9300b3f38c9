//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Install the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "avkit_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "avkit_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "avkit_http_requests_in_flight";

    // Upload metrics
    pub const UPLOADS_TOTAL: &str = "avkit_uploads_total";
    pub const UPLOAD_BYTES_TOTAL: &str = "avkit_upload_bytes_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "avkit_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an admitted upload.
pub fn record_upload(operation: &str, bytes: u64) {
    let labels = [("operation", operation.to_string())];
    counter!(names::UPLOADS_TOTAL, &labels).increment(1);
    counter!(names::UPLOAD_BYTES_TOTAL, &labels).increment(bytes);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Sanitize path for metrics labels (collapse file names).
fn sanitize_path(path: &str) -> String {
    match path.strip_prefix("/download/") {
        Some(_) => "/download/:filename".to_string(),
        None => path.to_string(),
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
