//! Response observation and error responses.
//!
//! # Responsibilities
//! - Log the outcome of each upstream exchange
//! - Build the fixed 502 returned when the upstream cannot be reached
//!
//! # Design Decisions
//! - The response record is written once upstream headers are available,
//!   before the body starts streaming back
//! - Upstream failures never leak transport errors to the caller

use axum::body::Body;
use axum::http::{header, HeaderValue, Method, Response, StatusCode};

/// Body sent with every 502.
pub const BAD_GATEWAY_BODY: &str = "Bad Gateway\n";

/// Render the record for a completed upstream response.
pub fn format_response(method: &Method, path: &str, status: StatusCode) -> String {
    format!(
        "RESPONSE: {} {} -> {} {}",
        method,
        path,
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    )
}

pub fn log_response(method: &Method, path: &str, status: StatusCode) {
    tracing::info!("{}", format_response(method, path, status));
}

/// Render the record for a failed forward.
pub fn format_failure(method: &Method, path: &str, detail: &str) -> String {
    format!("PROXY ERROR: {} {} -> {}", method, path, detail)
}

pub fn log_failure(method: &Method, path: &str, detail: &str) {
    tracing::error!("{}", format_failure(method, path, detail));
}

/// The fixed response sent to a caller when forwarding fails.
pub fn bad_gateway() -> Response<Body> {
    let mut response = Response::new(Body::from(BAD_GATEWAY_BODY));
    *response.status_mut() = StatusCode::BAD_GATEWAY;

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    response
}
