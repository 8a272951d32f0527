//! Alerting sinks.
//!
//! Alerts are best-effort: a sink never fails its caller. Delivery problems
//! are logged and dropped.

mod discord;

use async_trait::async_trait;
use tracing::{error, info};

pub use discord::DiscordNotifier;

/// Destination for human-facing notifications.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Informational update (success, notable decision).
    async fn notify(&self, title: &str, detail: &str);

    /// Something went wrong and needs attention.
    async fn notify_error(&self, title: &str, detail: &str);
}

/// Sink that only writes alerts to the log.
#[derive(Debug, Default, Clone)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn notify(&self, title: &str, detail: &str) {
        info!(alert = title, "{}", detail);
    }

    async fn notify_error(&self, title: &str, detail: &str) {
        error!(alert = title, "{}", detail);
    }
}
