//! Alert sink that remembers what it was told.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::alert::AlertSink;

/// Severity of a recorded alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Update,
    Error,
}

/// A recorded alert for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedAlert {
    pub level: AlertLevel,
    pub title: String,
    pub detail: String,
}

#[derive(Debug, Default, Clone)]
pub struct RecordingAlertSink {
    alerts: Arc<RwLock<Vec<RecordedAlert>>>,
}

impl RecordingAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn alerts(&self) -> Vec<RecordedAlert> {
        self.alerts.read().await.clone()
    }

    /// Whether any alert title contains `needle`.
    pub async fn has_title(&self, needle: &str) -> bool {
        self.alerts
            .read()
            .await
            .iter()
            .any(|a| a.title.contains(needle))
    }

    pub async fn error_count(&self) -> usize {
        self.alerts
            .read()
            .await
            .iter()
            .filter(|a| a.level == AlertLevel::Error)
            .count()
    }

    async fn push(&self, level: AlertLevel, title: &str, detail: &str) {
        self.alerts.write().await.push(RecordedAlert {
            level,
            title: title.to_string(),
            detail: detail.to_string(),
        });
    }
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    async fn notify(&self, title: &str, detail: &str) {
        self.push(AlertLevel::Update, title, detail).await;
    }

    async fn notify_error(&self, title: &str, detail: &str) {
        self.push(AlertLevel::Error, title, detail).await;
    }
}
