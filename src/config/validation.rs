//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect overlapping rewrite rules
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - The upstream address is checked by the resolver, not here

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("rewrite path '{0}' must start with '/'")]
    RelativePath(String),

    #[error("path '{0}' is listed as both a server-info and a settings-patch path")]
    OverlappingRule(String),
}

/// Check every semantic constraint of the configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.server_info.ip_servers.is_empty() {
        errors.push(ValidationError::Empty("server_info.ip_servers"));
    }
    if config.server_info.next_tick == 0 {
        errors.push(ValidationError::Zero("server_info.next_tick"));
    }

    let rewrite = &config.rewrite;
    for path in rewrite
        .server_info_paths
        .iter()
        .chain(&rewrite.settings_patch_paths)
        .chain(&config.logging.heartbeat_paths)
    {
        if !path.starts_with('/') {
            errors.push(ValidationError::RelativePath(path.clone()));
        }
    }

    let server_info: HashSet<&str> = rewrite.server_info_paths.iter().map(String::as_str).collect();
    for path in &rewrite.settings_patch_paths {
        if server_info.contains(path.as_str()) {
            errors.push(ValidationError::OverlappingRule(path.clone()));
        }
    }

    if matches!(rewrite.region_id.as_deref(), Some("")) {
        errors.push(ValidationError::Empty("rewrite.region_id"));
    }

    let zero_checks = [
        (config.timeouts.connect_secs == 0, "timeouts.connect_secs"),
        (config.timeouts.upstream_secs == 0, "timeouts.upstream_secs"),
        (config.timeouts.request_secs == 0, "timeouts.request_secs"),
        (config.limits.max_body_size == 0, "limits.max_body_size"),
        (config.notify.queue_capacity == 0, "notify.queue_capacity"),
        (config.notify.timeout_secs == 0, "notify.timeout_secs"),
    ];
    for (is_zero, field) in zero_checks {
        if is_zero {
            errors.push(ValidationError::Zero(field));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
