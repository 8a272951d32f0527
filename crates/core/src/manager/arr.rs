//! Radarr / Sonarr v3 API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::json;
use tracing::debug;

use crate::config::ArrConfig;

use super::{HistoryPage, ManagerError, ManagerKind, MediaManager};

/// HTTP client for a Radarr or Sonarr instance.
pub struct ArrClient {
    client: Client,
    config: ArrConfig,
    kind: ManagerKind,
}

impl ArrClient {
    /// Create a new client for the given manager.
    pub fn new(kind: ManagerKind, config: ArrConfig) -> Result<Self, ManagerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| ManagerError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            kind,
        })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.host.trim_end_matches('/')
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("X-Api-Key", &self.config.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ManagerError> {
        let response = self.authed(request).send().await.map_err(|e| {
            if e.is_timeout() {
                ManagerError::Timeout
            } else if e.is_connect() {
                ManagerError::ConnectionFailed(e.to_string())
            } else {
                ManagerError::ApiError(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ManagerError::AuthenticationFailed(format!(
                "{} rejected the API key",
                self.kind
            )));
        }

        let body = response.text().await.unwrap_or_default();
        Err(ManagerError::ApiError(format!(
            "HTTP {}: {}",
            status,
            body.chars().take(200).collect::<String>()
        )))
    }
}

#[async_trait]
impl MediaManager for ArrClient {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    async fn refresh_monitored_downloads(&self) -> Result<(), ManagerError> {
        let url = format!("{}/api/v3/command", self.base_url());
        self.send(
            self.client
                .post(&url)
                .json(&json!({ "name": "RefreshMonitoredDownloads" })),
        )
        .await?;
        debug!(manager = self.name(), "Requested monitored downloads refresh");
        Ok(())
    }

    async fn history(&self, page_size: u32) -> Result<HistoryPage, ManagerError> {
        let url = format!("{}/api/v3/history", self.base_url());
        let page_size = page_size.to_string();
        let response = self
            .send(self.client.get(&url).query(&[
                ("pageSize", page_size.as_str()),
                ("sortKey", "date"),
                ("sortDirection", "descending"),
            ]))
            .await?;

        response
            .json::<HistoryPage>()
            .await
            .map_err(|e| ManagerError::ApiError(format!("Failed to parse response: {}", e)))
    }

    async fn fail_history_item(&self, id: u64) -> Result<(), ManagerError> {
        let url = format!("{}/api/v3/history/failed/{}", self.base_url(), id);
        self.send(self.client.post(&url)).await?;
        Ok(())
    }
}
