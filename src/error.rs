//! Per-exchange error type.
//!
//! Every failure that reaches the handler boundary degrades to a
//! `502 Bad Gateway` carrying the error text. There is no retry.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::time::Duration;
use thiserror::Error;

/// Errors that abort one exchange.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Connection failure or protocol error talking to the upstream.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    /// Upstream did not produce a response head in time.
    #[error("upstream did not respond within {}s", .0.as_secs())]
    Timeout(Duration),

    /// Body could not be read or exceeded the buffering limit.
    #[error("failed to read body: {0}")]
    Body(#[source] axum::Error),

    /// Outbound request or rewritten response could not be assembled.
    #[error("failed to build message: {0}")]
    Http(#[from] axum::http::Error),

    /// Rewritten JSON could not be serialized.
    #[error("failed to serialize rewritten body: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        crate::http::response::gateway_error(&self)
    }
}

impl ProxyError {
    /// Status reported to the inbound caller.
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_GATEWAY
    }
}
