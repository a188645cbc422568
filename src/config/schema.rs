//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so a bare environment is enough to start.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Root configuration for the intercepting proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Vendor API the proxy forwards to.
    pub upstream: UpstreamConfig,

    /// Optional virtual-host allow-list.
    pub access: AccessConfig,

    /// Rewrite rule table.
    pub rewrite: RewriteConfig,

    /// Payload returned on the server-discovery path.
    pub server_info: ServerInfoConfig,

    /// Notification side channel.
    pub notify: NotifyConfig,

    /// Exchange logging.
    pub logging: LoggingConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Body size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base address of the vendor API (scheme and host only).
    pub url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://api.eu-pet.com".to_string(),
        }
    }
}

/// Access filter configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AccessConfig {
    /// Expected virtual host. `None` disables the filter.
    pub allowed_host: Option<String>,
}

/// Rewrite rule table configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Paths whose response is replaced by the server-info payload.
    pub server_info_paths: Vec<String>,

    /// Paths whose JSON response gets the device-settings patch.
    pub settings_patch_paths: Vec<String>,

    /// Region token written over a non-empty `result.regionId`.
    pub region_id: Option<String>,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            server_info_paths: vec![
                "/6/t4/dev_serverinfo".to_string(),
                "/6/t3/dev_serverinfo".to_string(),
            ],
            settings_patch_paths: vec![
                "/6/t4/dev_device_info".to_string(),
                "/6/t3/dev_device_info".to_string(),
                "/6/t4/dev_iot_device_info".to_string(),
                "/6/t4/dev_signup".to_string(),
                "/6/t3/dev_signup".to_string(),
            ],
            region_id: None,
        }
    }
}

/// Server-discovery substitution payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerInfoConfig {
    /// Addresses advertised as `ipServers`.
    pub ip_servers: Vec<String>,

    /// Addresses advertised as `apiServers`. Empty means derived from the
    /// upstream URL.
    pub api_servers: Vec<String>,

    /// Poll interval advertised as `nextTick`, in seconds.
    pub next_tick: u64,
}

impl ServerInfoConfig {
    /// Configured `apiServers`, or `<upstream_url>/6/` when none are set.
    pub fn api_servers_for(&self, upstream_url: &str) -> Vec<String> {
        if self.api_servers.is_empty() {
            vec![format!("{}/6/", upstream_url.trim_end_matches('/'))]
        } else {
            self.api_servers.clone()
        }
    }
}

impl Default for ServerInfoConfig {
    fn default() -> Self {
        Self {
            ip_servers: Vec::new(),
            api_servers: Vec::new(),
            next_tick: 3600,
        }
    }
}

/// Notification side channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Bot token used in the API path.
    pub bot_token: Option<String>,

    /// Recipient chat identifier.
    pub chat_id: Option<String>,

    /// Serial number of the tracked device.
    pub target_sn: Option<String>,

    /// Base URL of the bot API.
    pub api_base: String,

    /// Maximum number of queued notifications.
    pub queue_capacity: usize,

    /// Delivery timeout in seconds.
    pub timeout_secs: u64,
}

impl NotifyConfig {
    /// Token and chat ID, when both are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let token = self.bot_token.as_deref().filter(|t| !t.is_empty())?;
        let chat = self.chat_id.as_deref().filter(|c| !c.is_empty())?;
        Some((token, chat))
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            target_sn: None,
            api_base: "https://api.telegram.org".to_string(),
            queue_capacity: 64,
            timeout_secs: 10,
        }
    }
}

/// Exchange logging verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogMode {
    /// Log every exchange with headers and bodies.
    #[default]
    Verbose,
    /// Log exchanges without headers, skipping heartbeat paths.
    Short,
    /// No exchange logging.
    Silent,
}

impl FromStr for LogMode {
    type Err = std::convert::Infallible;

    /// Anything other than `short` or `silent` means verbose.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "short" => LogMode::Short,
            "silent" | "off" => LogMode::Silent,
            _ => LogMode::Verbose,
        })
    }
}

impl fmt::Display for LogMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogMode::Verbose => "verbose",
            LogMode::Short => "short",
            LogMode::Silent => "silent",
        };
        f.write_str(s)
    }
}

/// Exchange logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Verbosity of exchange logging.
    pub mode: LogMode,

    /// High-frequency paths skipped outside verbose mode.
    pub heartbeat_paths: Vec<String>,

    /// Largest body (declared length, bytes) captured into the log.
    pub body_log_limit: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            mode: LogMode::Verbose,
            heartbeat_paths: vec![
                "/6/poll/t4/heartbeat".to_string(),
                "/6/poll/t3/heartbeat".to_string(),
            ],
            body_log_limit: 64 * 1024,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for the upstream to answer with a response head, in seconds.
    pub upstream_secs: u64,

    /// Total time for handling one inbound request, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
            request_secs: 60,
        }
    }
}

/// Body size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum response body buffered for patching, in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
