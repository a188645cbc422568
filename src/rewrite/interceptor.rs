//! Response interception.
//!
//! Dispatches an upstream response by request path to at most one rewrite
//! rule, applies it, and runs the notification check.
//!
//! ```text
//! Forwarded ─┬─ no rule ────────────→ PassThrough
//!            ├─ ServerInfo ─────────→ Substituted
//!            └─ DeviceSettings ─┬───→ Patched ─→ notify check
//!                               └───→ Unparsed (decode failed, original bytes)
//! ```

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, Method, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::response::replace_body;
use crate::notify::{NotificationEvent, Notifier};
use crate::observability::ExchangeLogger;
use crate::rewrite::server_info::ServerInfo;
use crate::rewrite::settings::patch_device_settings;
use crate::rewrite::{RewriteTable, RuleKind};

/// Request-side facts the interceptor needs about one exchange.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub request_id: String,
    pub method: Method,
    pub path: String,
}

/// What happened to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    PassThrough,
    Substituted,
    Patched,
    /// Patch candidate whose body was not JSON; forwarded unchanged.
    Unparsed,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::PassThrough => "pass_through",
            Disposition::Substituted => "substituted",
            Disposition::Patched => "patched",
            Disposition::Unparsed => "unparsed",
        }
    }
}

/// Applies the rewrite table to upstream responses.
#[derive(Debug)]
pub struct ResponseInterceptor {
    table: Arc<RewriteTable>,
    server_info: ServerInfo,
    region_id: Option<String>,
    target_sn: Option<String>,
    max_body_size: usize,
    logger: ExchangeLogger,
    notifier: Arc<dyn Notifier>,
}

impl ResponseInterceptor {
    pub fn new(config: &ProxyConfig, table: Arc<RewriteTable>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            table,
            server_info: ServerInfo::new(&config.server_info, &config.upstream.url),
            region_id: config.rewrite.region_id.clone(),
            target_sn: config.notify.target_sn.clone().filter(|sn| !sn.is_empty()),
            max_body_size: config.limits.max_body_size,
            logger: ExchangeLogger::new(&config.logging),
            notifier,
        }
    }

    /// Run the response through the matching rule, if any.
    pub async fn intercept(
        &self,
        exchange: &Exchange,
        response: Response<Body>,
    ) -> Result<(Response<Body>, Disposition), ProxyError> {
        match self.table.lookup(&exchange.path) {
            None => self.pass_through(exchange, response).await,
            Some(RuleKind::ServerInfo) => self.substitute(exchange, response),
            Some(RuleKind::DeviceSettings) => self.patch(exchange, response).await,
        }
    }

    async fn pass_through(
        &self,
        exchange: &Exchange,
        response: Response<Body>,
    ) -> Result<(Response<Body>, Disposition), ProxyError> {
        if !self.logger.enabled_for(&exchange.path) {
            return Ok((response, Disposition::PassThrough));
        }

        let Some(len) = self.logger.capture_len(response.headers()) else {
            self.logger
                .log_response(&exchange.request_id, response.status(), response.headers(), None);
            return Ok((response, Disposition::PassThrough));
        };

        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(body, len).await.map_err(ProxyError::Body)?;
        self.logger
            .log_response(&exchange.request_id, parts.status, &parts.headers, Some(&bytes));

        Ok((Response::from_parts(parts, Body::from(bytes)), Disposition::PassThrough))
    }

    fn substitute(
        &self,
        exchange: &Exchange,
        response: Response<Body>,
    ) -> Result<(Response<Body>, Disposition), ProxyError> {
        // The upstream body is dropped unread.
        let (mut parts, _) = response.into_parts();
        let body = self.server_info.render()?;

        tracing::info!(
            request_id = %exchange.request_id,
            path = %exchange.path,
            upstream_status = %parts.status,
            "Modifying IPServers and APIServers"
        );

        parts.status = StatusCode::OK;
        parts.headers.remove(header::CONTENT_ENCODING);
        parts
            .headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut response = Response::from_parts(parts, Body::empty());
        replace_body(&mut response, body.clone());
        self.log_final(exchange, &response, &body);

        Ok((response, Disposition::Substituted))
    }

    async fn patch(
        &self,
        exchange: &Exchange,
        response: Response<Body>,
    ) -> Result<(Response<Body>, Disposition), ProxyError> {
        let (parts, body) = response.into_parts();
        let original = axum::body::to_bytes(body, self.max_body_size)
            .await
            .map_err(ProxyError::Body)?;

        let mut doc: Value = match serde_json::from_slice(&original) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(
                    request_id = %exchange.request_id,
                    path = %exchange.path,
                    error = %e,
                    "JSON parse error, forwarding original body"
                );
                // Upstream headers are kept as sent, including Content-Length.
                let response = Response::from_parts(parts, Body::from(original));
                return Ok((response, Disposition::Unparsed));
            }
        };
        let mut response = Response::from_parts(parts, Body::empty());

        let report = patch_device_settings(&mut doc, self.region_id.as_deref());

        if let Some(previous) = &report.auto_work {
            tracing::info!(
                request_id = %exchange.request_id,
                path = %exchange.path,
                previous = %previous,
                "Modifying autoWork to 1"
            );
        }
        if let Some(previous) = &report.region {
            tracing::info!(
                request_id = %exchange.request_id,
                previous = %previous,
                "Modifying regionId"
            );
        }

        let body = Bytes::from(serde_json::to_vec(&doc)?);

        if report.matches_serial(self.target_sn.as_deref()) {
            let event = NotificationEvent {
                status: response.status(),
                method: exchange.method.clone(),
                path: exchange.path.clone(),
                body: self
                    .logger
                    .is_verbose()
                    .then(|| String::from_utf8_lossy(&body).into_owned()),
            };
            self.notifier.notify(event);
        }

        replace_body(&mut response, body.clone());
        self.log_final(exchange, &response, &body);

        Ok((response, Disposition::Patched))
    }

    fn log_final(&self, exchange: &Exchange, response: &Response<Body>, body: &[u8]) {
        if self.logger.enabled_for(&exchange.path) {
            self.logger.log_response(
                &exchange.request_id,
                response.status(),
                response.headers(),
                Some(body),
            );
        }
    }
}
