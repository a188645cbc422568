//! Server-discovery substitution.
//!
//! The device asks the cloud which servers to talk to; the answer is
//! replaced wholesale so it points at operator-controlled addresses. The
//! upstream body is never read.

use axum::body::Bytes;
use serde::Serialize;

use crate::config::ServerInfoConfig;

/// Fixed discovery payload advertised to devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    ip_servers: Vec<String>,
    api_servers: Vec<String>,
    next_tick: u64,
}

#[derive(Serialize)]
struct Envelope<'a> {
    result: Payload<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Payload<'a> {
    ip_servers: &'a [String],
    api_servers: &'a [String],
    next_tick: u64,
    linked: u8,
}

impl ServerInfo {
    /// `upstream_url` supplies `apiServers` when none are configured.
    pub fn new(config: &ServerInfoConfig, upstream_url: &str) -> Self {
        Self {
            ip_servers: config.ip_servers.clone(),
            api_servers: config.api_servers_for(upstream_url),
            next_tick: config.next_tick,
        }
    }

    /// Serialize the replacement body.
    pub fn render(&self) -> Result<Bytes, serde_json::Error> {
        let envelope = Envelope {
            result: Payload {
                ip_servers: &self.ip_servers,
                api_servers: &self.api_servers,
                next_tick: self.next_tick,
                linked: 0,
            },
        };
        serde_json::to_vec(&envelope).map(Bytes::from)
    }
}
