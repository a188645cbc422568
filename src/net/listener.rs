//! TCP listener setup.
//!
//! # Responsibilities
//! - Parse the configured bind address
//! - Bind the socket; failure is fatal at startup

use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Bind address did not parse.
    #[error("Invalid bind address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// Failed to bind to address.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Bind to the configured address.
pub async fn bind(config: &ListenerConfig) -> Result<TcpListener, ListenerError> {
    let address: SocketAddr =
        config
            .bind_address
            .parse()
            .map_err(|source| ListenerError::Address {
                address: config.bind_address.clone(),
                source,
            })?;

    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| ListenerError::Bind { address, source })?;

    if let Ok(local_addr) = listener.local_addr() {
        tracing::info!(address = %local_addr, "Listener bound");
    }

    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let listener = bind(&ListenerConfig {
            bind_address: "127.0.0.1:0".into(),
        })
        .await
        .unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_conflict_is_error() {
        let first = bind(&ListenerConfig {
            bind_address: "127.0.0.1:0".into(),
        })
        .await
        .unwrap();
        let taken = first.local_addr().unwrap().to_string();

        let err = bind(&ListenerConfig { bind_address: taken }).await.unwrap_err();
        assert!(matches!(err, ListenerError::Bind { .. }));
    }

    #[tokio::test]
    async fn test_bad_address_is_error() {
        let err = bind(&ListenerConfig {
            bind_address: "localhost".into(),
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ListenerError::Address { .. }));
    }
}
