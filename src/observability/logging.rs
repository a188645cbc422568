//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Decide, per exchange, what gets logged (mode, heartbeat suppression)
//! - Emit request/response diagnostics with a capped body copy
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Log level configurable via `RUST_LOG`; exchange detail via `LogMode`
//! - Bodies are only captured when their declared length is under the cap,
//!   so logging never buffers an unbounded payload

use axum::http::{header, HeaderMap, Method, StatusCode, Uri, Version};
use std::collections::HashSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogMode, LoggingConfig};

const DEFAULT_FILTER: &str = "intercept_proxy=info,tower_http=info";

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Per-exchange diagnostic logging policy.
#[derive(Debug, Clone)]
pub struct ExchangeLogger {
    mode: LogMode,
    heartbeat_paths: HashSet<String>,
    body_limit: usize,
}

impl ExchangeLogger {
    pub fn new(config: &LoggingConfig) -> Self {
        Self {
            mode: config.mode,
            heartbeat_paths: config.heartbeat_paths.iter().cloned().collect(),
            body_limit: config.body_log_limit,
        }
    }

    /// Headers and full notification bodies are only included in verbose mode.
    pub fn is_verbose(&self) -> bool {
        self.mode == LogMode::Verbose
    }

    /// Whether an exchange on `path` is logged at all.
    pub fn enabled_for(&self, path: &str) -> bool {
        match self.mode {
            LogMode::Verbose => true,
            LogMode::Short => !self.heartbeat_paths.contains(path),
            LogMode::Silent => false,
        }
    }

    /// Declared body length, if it is small enough to capture.
    pub fn capture_len(&self, headers: &HeaderMap) -> Option<usize> {
        headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|len| *len <= self.body_limit)
    }

    pub fn log_request(
        &self,
        request_id: &str,
        method: &Method,
        uri: &Uri,
        version: Version,
        headers: &HeaderMap,
        body: Option<&[u8]>,
    ) {
        tracing::info!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            version = ?version,
            ">>> Request"
        );
        if self.is_verbose() {
            tracing::info!(request_id = %request_id, headers = ?headers, ">>> Headers");
        }
        match body {
            Some(body) if !body.is_empty() => {
                tracing::info!(
                    request_id = %request_id,
                    body = %String::from_utf8_lossy(body),
                    ">>> Body"
                );
            }
            Some(_) => {}
            None => tracing::debug!(request_id = %request_id, ">>> Body not captured"),
        }
    }

    pub fn log_response(
        &self,
        request_id: &str,
        status: StatusCode,
        headers: &HeaderMap,
        body: Option<&[u8]>,
    ) {
        tracing::info!(request_id = %request_id, status = %status, "<<< Response");
        if self.is_verbose() {
            tracing::info!(request_id = %request_id, headers = ?headers, "<<< Headers");
        }
        match body {
            Some(body) => {
                tracing::info!(
                    request_id = %request_id,
                    body = %String::from_utf8_lossy(body),
                    "<<< Body"
                );
            }
            None => tracing::debug!(request_id = %request_id, "<<< Body not captured"),
        }
    }
}
