//! Request logging middleware

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Request logging middleware
pub struct RequestLogging;

impl RequestLogging {
    /// Log method, path, status and latency; health probes only at debug
    pub async fn log_request(req: Request<Body>, next: Next) -> Response {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let start = Instant::now();

        let response = next.run(req).await;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let status = response.status();

        if path == "/health" {
            debug!("{} {} - {} in {}ms", method, path, status, elapsed_ms);
        } else if status.is_server_error() {
            warn!(status = status.as_u16(), elapsed_ms, "{} {} failed", method, path);
        } else {
            info!(status = status.as_u16(), elapsed_ms, "{} {}", method, path);
        }

        response
    }
}
