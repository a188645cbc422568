//! Telegram bot delivery.
//!
//! Events are queued on a bounded channel and delivered by one background
//! task, so a slow or unreachable bot API never holds up a proxied response.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::NotifyConfig;
use crate::notify::{NotificationEvent, Notifier};
use crate::observability::metrics;

/// Errors raised by notification delivery.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("bot API returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Queue-backed notifier posting to `<api_base>/bot<token>/sendMessage`.
#[derive(Debug)]
pub struct TelegramNotifier {
    queue: mpsc::Sender<String>,
}

impl TelegramNotifier {
    /// Start the delivery worker and return the queue handle.
    ///
    /// The worker exits once every handle has been dropped.
    pub fn spawn(config: &NotifyConfig, token: &str, chat_id: &str) -> Result<Self, NotifyError> {
        let (notifier, _worker) = Self::spawn_with_handle(config, token, chat_id)?;
        Ok(notifier)
    }

    /// Like [`TelegramNotifier::spawn`], also returning the worker handle.
    pub fn spawn_with_handle(
        config: &NotifyConfig,
        token: &str,
        chat_id: &str,
    ) -> Result<(Self, JoinHandle<()>), NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(NotifyError::Client)?;

        let endpoint = format!(
            "{}/bot{}/sendMessage",
            config.api_base.trim_end_matches('/'),
            token
        );

        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let worker = Worker {
            client,
            endpoint,
            chat_id: chat_id.to_string(),
        };
        let handle = tokio::spawn(worker.run(rx));

        Ok((Self { queue: tx }, handle))
    }
}

impl Notifier for TelegramNotifier {
    fn notify(&self, event: NotificationEvent) {
        match self.queue.try_send(event.message()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(path = %event.path, "Notification queue full, dropping event");
                metrics::record_notification("dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(path = %event.path, "Notification worker stopped, dropping event");
                metrics::record_notification("dropped");
            }
        }
    }
}

struct Worker {
    client: reqwest::Client,
    // Contains the bot token; never logged.
    endpoint: String,
    chat_id: String,
}

impl Worker {
    async fn run(self, mut rx: mpsc::Receiver<String>) {
        while let Some(text) = rx.recv().await {
            match self.deliver(&text).await {
                Ok(()) => {
                    tracing::debug!("Notification delivered");
                    metrics::record_notification("delivered");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Error sending Telegram message");
                    metrics::record_notification("failed");
                }
            }
        }
        tracing::debug!("Notification worker stopped");
    }

    async fn deliver(&self, text: &str) -> Result<(), NotifyError> {
        let message = SendMessage {
            chat_id: &self.chat_id,
            text,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&message)
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api { status, body });
        }
        Ok(())
    }
}
