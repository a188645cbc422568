//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Point the outbound request at the upstream (scheme, authority, Host)
//! - Log the inbound request without consuming its body
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Bodies are buffered only when logged and under the capture cap; the
//!   buffered bytes are what gets forwarded
//! - Rewrite-table paths ask the upstream for an identity-encoded body

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderName, HeaderValue, Request, Version};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::request_id::{MakeRequestId, RequestId, SetRequestIdLayer};
use uuid::Uuid;

use crate::error::ProxyError;
use crate::http::response::strip_hop_by_hop;
use crate::observability::ExchangeLogger;
use crate::rewrite::RewriteTable;
use crate::upstream::UpstreamTarget;

/// Header carrying the per-exchange request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()?;
        Some(RequestId::new(id))
    }
}

/// Layer that stamps inbound requests with an `x-request-id` unless one is present.
pub fn request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID), MakeRequestUuid)
}

/// Read the request ID assigned by [`request_id_layer`].
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Rewrites inbound requests so they target the upstream.
#[derive(Debug)]
pub struct RequestDirector {
    upstream: UpstreamTarget,
    table: Arc<RewriteTable>,
    logger: ExchangeLogger,
}

impl RequestDirector {
    pub fn new(upstream: UpstreamTarget, table: Arc<RewriteTable>, logger: ExchangeLogger) -> Self {
        Self {
            upstream,
            table,
            logger,
        }
    }

    /// Produce the outbound request. Method, path, query, end-to-end headers
    /// and body are preserved.
    pub async fn direct(
        &self,
        request_id: &str,
        request: Request<Body>,
    ) -> Result<Request<Body>, ProxyError> {
        let (mut parts, body) = request.into_parts();
        let path = parts.uri.path().to_string();

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        parts.uri = self.upstream.uri_for(parts.uri.path_and_query())?;
        let inbound_version = parts.version;
        parts.version = Version::HTTP_11;

        let headers = &mut parts.headers;
        strip_hop_by_hop(headers);
        headers.insert(header::HOST, self.upstream.host_header());
        if let Some(ip) = peer {
            append_forwarded_for(headers, &ip.to_string());
        }
        if self.table.contains(&path) {
            headers.remove(header::ACCEPT_ENCODING);
        }

        if !self.logger.enabled_for(&path) {
            return Ok(Request::from_parts(parts, body));
        }

        let body = match self.logger.capture_len(&parts.headers) {
            Some(len) => {
                let bytes = axum::body::to_bytes(body, len).await.map_err(ProxyError::Body)?;
                self.logger.log_request(
                    request_id,
                    &parts.method,
                    &parts.uri,
                    inbound_version,
                    &parts.headers,
                    Some(&bytes),
                );
                Body::from(bytes)
            }
            None => {
                self.logger.log_request(
                    request_id,
                    &parts.method,
                    &parts.uri,
                    inbound_version,
                    &parts.headers,
                    None,
                );
                body
            }
        };

        Ok(Request::from_parts(parts, body))
    }
}

fn append_forwarded_for(headers: &mut axum::http::HeaderMap, ip: &str) {
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) => format!("{}, {}", existing, ip),
        None => ip.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogMode, LoggingConfig, RewriteConfig};
    use axum::http::Method;

    fn director(mode: LogMode) -> RequestDirector {
        let logger = ExchangeLogger::new(&LoggingConfig {
            mode,
            ..LoggingConfig::default()
        });
        let table = Arc::new(RewriteTable::from_config(&RewriteConfig::default()));
        RequestDirector::new(UpstreamTarget::parse("http://api.eu-pet.com").unwrap(), table, logger)
    }

    #[tokio::test]
    async fn test_direct_rewrites_target() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/6/t4/dev_device_info?ts=1")
            .header(header::HOST, "proxy.local:8080")
            .header(header::CONNECTION, "keep-alive")
            .header(header::ACCEPT_ENCODING, "gzip")
            .header("x-device", "feeder")
            .header(header::CONTENT_LENGTH, "9")
            .body(Body::from("id=ABC123"))
            .unwrap();

        let out = director(LogMode::Verbose).direct("test", request).await.unwrap();

        assert_eq!(out.method(), Method::POST);
        assert_eq!(out.uri().to_string(), "http://api.eu-pet.com/6/t4/dev_device_info?ts=1");
        assert_eq!(out.version(), Version::HTTP_11);
        assert_eq!(out.headers()[header::HOST], "api.eu-pet.com");
        assert_eq!(out.headers()["x-device"], "feeder");
        assert!(!out.headers().contains_key(header::CONNECTION));
        assert!(!out.headers().contains_key(header::ACCEPT_ENCODING));

        let body = axum::body::to_bytes(out.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"id=ABC123");
    }

    #[tokio::test]
    async fn test_direct_keeps_encoding_on_unmatched_path() {
        let request = Request::builder()
            .uri("/6/poll/t4/heartbeat")
            .header(header::ACCEPT_ENCODING, "gzip")
            .body(Body::empty())
            .unwrap();

        let out = director(LogMode::Silent).direct("test", request).await.unwrap();
        assert_eq!(out.headers()[header::ACCEPT_ENCODING], "gzip");
    }

    #[tokio::test]
    async fn test_forwarded_for_appended() {
        let mut request = Request::builder()
            .uri("/")
            .header(X_FORWARDED_FOR, "10.1.1.1")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo("192.168.1.50:41000".parse::<SocketAddr>().unwrap()));

        let out = director(LogMode::Short).direct("test", request).await.unwrap();
        assert_eq!(out.headers()[X_FORWARDED_FOR], "10.1.1.1, 192.168.1.50");
    }

    #[test]
    fn test_request_id_generated() {
        let mut make = MakeRequestUuid;
        let request = Request::builder().body(()).unwrap();
        let id = make.make_request_id(&request).unwrap();
        assert_eq!(id.header_value().len(), 36);
    }
}
