//! Discord webhook alert sink.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::warn;

use crate::config::DiscordConfig;

use super::AlertSink;

/// Discord caps embed descriptions at 4096 characters.
const MAX_DESCRIPTION_CHARS: usize = 4000;
const MAX_TITLE_CHARS: usize = 256;

const COLOR_UPDATE: u32 = 0x2ecc71;
const COLOR_ERROR: u32 = 0xe74c3c;

#[derive(Debug, Serialize)]
struct WebhookPayload {
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    description: String,
    color: u32,
    timestamp: String,
}

/// Posts alerts as webhook embeds.
pub struct DiscordNotifier {
    client: Client,
    config: DiscordConfig,
}

impl DiscordNotifier {
    pub fn new(config: DiscordConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, config }
    }

    fn payload(title: &str, detail: &str, color: u32) -> WebhookPayload {
        WebhookPayload {
            embeds: vec![Embed {
                title: truncate(title, MAX_TITLE_CHARS),
                description: truncate(detail, MAX_DESCRIPTION_CHARS),
                color,
                timestamp: Utc::now().to_rfc3339(),
            }],
        }
    }

    async fn post(&self, payload: WebhookPayload) {
        let result = self
            .client
            .post(&self.config.webhook_url)
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(response) if !response.status().is_success() => {
                warn!("Discord webhook rejected alert: HTTP {}", response.status());
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to deliver Discord alert: {}", e),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

#[async_trait]
impl AlertSink for DiscordNotifier {
    async fn notify(&self, title: &str, detail: &str) {
        if self.config.enabled && self.config.update_enabled {
            self.post(Self::payload(title, detail, COLOR_UPDATE)).await;
        }
    }

    async fn notify_error(&self, title: &str, detail: &str) {
        if self.config.enabled {
            self.post(Self::payload(title, detail, COLOR_ERROR)).await;
        }
    }
}
