//! Response handling and transformation.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers from upstream responses
//! - Replace bodies and keep `Content-Length` in step with them
//! - Map exchange failures to the fixed gateway error
//!
//! # Design Decisions
//! - Pass-through bodies stream; only rewritten bodies are buffered
//! - A replaced body always gets an explicit length and no transfer coding

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;

use crate::error::ProxyError;

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Check if a header is a hop-by-hop header.
pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Swap in a new body and recompute the length header to match it.
pub fn replace_body(response: &mut Response<Body>, bytes: Bytes) {
    let headers = response.headers_mut();
    headers.remove(header::TRANSFER_ENCODING);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
    *response.body_mut() = Body::from(bytes);
}

/// The fixed response returned when an exchange fails.
pub fn gateway_error(err: &ProxyError) -> axum::response::Response {
    (err.status(), format!("Proxy error: {}", err)).into_response()
}

/// Rejection used by the access filter.
pub fn host_not_allowed() -> axum::response::Response {
    (StatusCode::FORBIDDEN, "403 - Host not allowed").into_response()
}
