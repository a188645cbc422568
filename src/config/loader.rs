//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::{LogMode, ProxyConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the startup configuration: file (or defaults), then environment
/// overrides, then validation.
pub fn load(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    load_with(path, |key| std::env::var(key).ok())
}

fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<ProxyConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ProxyConfig::default(),
    };

    apply_env(&mut config, lookup);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` abstracts `std::env::var`; empty values count as unset.
pub fn apply_env<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = get("UPSTREAM_URL") {
        config.upstream.url = url;
    }
    if let Some(addr) = get("LISTEN_ADDR") {
        config.listener.bind_address = addr;
    }

    if let Some(ip) = get("SERVER_IP") {
        let server = match get("SERVER_PORT") {
            Some(port) => format!("http://{}:{}/6/", ip, port),
            None => format!("http://{}/6/", ip),
        };
        config.server_info.ip_servers = vec![server];
    }

    if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
        config.notify.bot_token = Some(token);
    }
    if let Some(chat) = get("TELEGRAM_CHAT_ID") {
        config.notify.chat_id = Some(chat);
    }
    if let Some(sn) = get("TARGET_SN") {
        config.notify.target_sn = Some(sn);
    }

    if let Some(format) = get("LOG_FORMAT") {
        config.logging.mode = format.parse().unwrap_or(LogMode::Verbose);
    }

    if let Some(host) = get("ALLOWED_HOST") {
        config.access.allowed_host = Some(host);
    }
    if let Some(region) = get("REGION_ID") {
        config.rewrite.region_id = Some(region);
    }
}
