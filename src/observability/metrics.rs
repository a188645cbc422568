//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, disposition
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_notifications_total` (counter): notification outcomes
//!
//! Without an installed recorder every call is a no-op.

use ::metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one completed exchange.
pub fn record_request(method: &str, status: u16, disposition: &'static str, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "disposition" => disposition
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "disposition" => disposition)
        .record(start.elapsed().as_secs_f64());
}

/// Record a notification outcome (`delivered`, `failed`, `dropped`).
pub fn record_notification(outcome: &'static str) {
    counter!("proxy_notifications_total", "outcome" => outcome).increment(1);
}
