//! Access Control Middleware.
//! Rejects requests addressed to a virtual host other than the expected one.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::config::AccessConfig;
use crate::http::response::host_not_allowed;

/// Virtual-host filter state.
#[derive(Debug, Clone, Default)]
pub struct AccessFilter {
    allowed_host: Option<String>,
}

impl AccessFilter {
    pub fn new(config: &AccessConfig) -> Self {
        Self {
            allowed_host: config
                .allowed_host
                .as_deref()
                .map(strip_port)
                .filter(|h| !h.is_empty())
                .map(str::to_lowercase),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.allowed_host.is_some()
    }

    /// Whether a request for `host` may be forwarded.
    pub fn allows(&self, host: Option<&str>) -> bool {
        match &self.allowed_host {
            None => true,
            Some(expected) => host
                .map(|h| strip_port(h).eq_ignore_ascii_case(expected))
                .unwrap_or(false),
        }
    }
}

fn strip_port(host: &str) -> &str {
    let host = host.trim();
    if host.starts_with('[') {
        // IPv6 literal, keep the brackets.
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

fn request_host(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| req.uri().host())
}

pub async fn access_control_middleware(
    State(filter): State<Arc<AccessFilter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    // Passthrough when no host is configured.
    if !filter.is_enabled() {
        return next.run(req).await;
    }

    let host = request_host(&req);
    if filter.allows(host) {
        next.run(req).await
    } else {
        tracing::warn!(host = host.unwrap_or("<none>"), "Rejected request for host");
        host_not_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware, routing::any, Router};
    use tower::ServiceExt;

    fn filter(host: Option<&str>) -> AccessFilter {
        AccessFilter::new(&AccessConfig {
            allowed_host: host.map(str::to_string),
        })
    }

    #[test]
    fn test_disabled_allows_everything() {
        let filter = filter(None);
        assert!(filter.allows(Some("anything.example")));
        assert!(filter.allows(None));
    }

    #[test]
    fn test_host_matching() {
        let filter = filter(Some("api.eu-pet.com"));

        assert!(filter.allows(Some("api.eu-pet.com")));
        assert!(filter.allows(Some("API.EU-PET.COM:80")));
        assert!(!filter.allows(Some("evil.example")));
        assert!(!filter.allows(None));
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("example.com:8080"), "example.com");
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("[::1]:8080"), "[::1]");
    }

    #[tokio::test]
    async fn test_middleware_rejects_foreign_host() {
        let app = Router::new()
            .route("/{*path}", any(|| async { "forwarded" }))
            .layer(middleware::from_fn_with_state(
                Arc::new(filter(Some("api.eu-pet.com"))),
                access_control_middleware,
            ));

        let rejected = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/6/t4/dev_device_info")
                    .header(header::HOST, "other.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::FORBIDDEN);
        let body = axum::body::to_bytes(rejected.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"403 - Host not allowed");

        let allowed = app
            .oneshot(
                Request::builder()
                    .uri("/6/t4/dev_device_info")
                    .header(header::HOST, "api.eu-pet.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
    }
}
