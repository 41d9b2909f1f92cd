//! Prometheus metrics for the API server.
//!
//! Composition metrics are recorded by the worker crate through the same
//! `metrics` facade and exported by the recorder installed here.

use std::sync::OnceLock;
use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;

/// Install the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "reelstack_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "reelstack_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "reelstack_http_requests_in_flight";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Sanitize an unmatched path for metrics labels (remove IDs).
fn sanitize_path(path: &str) -> String {
    static UUID: OnceLock<Option<Regex>> = OnceLock::new();
    static NUMERIC: OnceLock<Option<Regex>> = OnceLock::new();

    let uuid = UUID.get_or_init(|| {
        Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").ok()
    });
    let numeric = NUMERIC.get_or_init(|| Regex::new(r"/[0-9]+(/|$)").ok());

    let mut path = path.to_string();
    if let Some(re) = uuid {
        path = re.replace_all(&path, ":id").to_string();
    }
    if let Some(re) = numeric {
        path = re.replace_all(&path, "/:id$1").to_string();
    }
    path
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = match request.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_string(),
        None => sanitize_path(request.uri().path()),
    };
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    record_http_request(&method, &path, status, start.elapsed().as_secs_f64());

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/files/550e8400-e29b-41d4-a716-446655440000/output.mp4"),
            "/files/:id/output.mp4"
        );
        assert_eq!(sanitize_path("/jobs/42"), "/jobs/:id");
        assert_eq!(sanitize_path("/create-video"), "/create-video");
    }
}
