//! Notification side channel.
//!
//! # Data Flow
//! ```text
//! ResponseInterceptor (settings patch fired for the tracked serial)
//!     → Notifier::notify(event)        (never blocks, never fails)
//!     → telegram.rs bounded queue
//!     → background worker → bot API
//! ```
//!
//! # Design Decisions
//! - The interceptor only sees the `Notifier` trait, so patch logic is
//!   testable without network access
//! - Delivery problems are logged and dropped; they never reach the client
//! - Missing credentials select `DisabledNotifier`, reported once at startup

pub mod telegram;

use axum::http::{Method, StatusCode};
use std::fmt;
use std::sync::Arc;

use crate::config::NotifyConfig;

pub use telegram::{NotifyError, TelegramNotifier};

/// A tracked device reported a patched settings block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub status: StatusCode,
    pub method: Method,
    pub path: String,
    /// Rewritten response body, included in verbose mode.
    pub body: Option<String>,
}

impl NotificationEvent {
    /// Text delivered to the recipient.
    pub fn message(&self) -> String {
        let mut message = format!("Response: {} for {} {}", self.status, self.method, self.path);
        if let Some(body) = &self.body {
            message.push_str(" | Body: ");
            message.push_str(body);
        }
        message
    }
}

impl fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Fire-and-forget alert sink.
pub trait Notifier: Send + Sync + fmt::Debug {
    /// Hand off an event. Must return without waiting on delivery.
    fn notify(&self, event: NotificationEvent);
}

/// Used when credentials are not configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNotifier;

impl Notifier for DisabledNotifier {
    fn notify(&self, _event: NotificationEvent) {}
}

/// Pick the notifier for the configured credentials.
///
/// Must be called from within a Tokio runtime.
pub fn from_config(config: &NotifyConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    match config.credentials() {
        Some((token, chat_id)) => {
            let notifier = TelegramNotifier::spawn(config, token, chat_id)?;
            tracing::info!(
                chat_id = %chat_id,
                target_sn = config.target_sn.as_deref().unwrap_or("<unset>"),
                "Notifications enabled"
            );
            Ok(Arc::new(notifier))
        }
        None => {
            tracing::info!("Telegram bot token or chat ID not set, notifications disabled");
            Ok(Arc::new(DisabledNotifier))
        }
    }
}
