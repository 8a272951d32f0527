//! Types for media manager operations.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to a media manager.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Which media manager a drop folder belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerKind {
    /// Movies. Every item selects only its largest media file.
    Radarr,
    /// Episodes and season packs.
    Sonarr,
}

impl ManagerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManagerKind::Radarr => "radarr",
            ManagerKind::Sonarr => "sonarr",
        }
    }
}

impl fmt::Display for ManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ManagerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "radarr" => Ok(ManagerKind::Radarr),
            "sonarr" => Ok(ManagerKind::Sonarr),
            other => Err(format!("unknown manager '{}', expected radarr or sonarr", other)),
        }
    }
}

/// Extra data attached to a history record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryData {
    #[serde(default)]
    pub torrent_info_hash: Option<String>,
}

/// One entry of the manager's download history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: u64,
    #[serde(default)]
    pub source_title: String,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub data: HistoryData,
}

/// A page of history records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryPage {
    #[serde(default)]
    pub records: Vec<HistoryRecord>,
}

/// Trait for media manager backends (Radarr, Sonarr).
#[async_trait]
pub trait MediaManager: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Ask the manager to rescan its download clients.
    async fn refresh_monitored_downloads(&self) -> Result<(), ManagerError>;

    /// Most recent history records.
    async fn history(&self, page_size: u32) -> Result<HistoryPage, ManagerError>;

    /// Mark a history record as failed so the manager searches again.
    async fn fail_history_item(&self, id: u64) -> Result<(), ManagerError>;
}

/// Sanitize a title the way the managers build file names.
pub fn clean_file_name(name: &str) -> String {
    const REPLACEMENTS: [(char, &str); 9] = [
        ('\\', "+"),
        ('/', "+"),
        ('<', ""),
        ('>', ""),
        ('?', "!"),
        ('*', "-"),
        (':', ""),
        ('|', ""),
        ('"', ""),
    ];

    let mut result = String::with_capacity(name.len());
    for c in name.chars() {
        match REPLACEMENTS.iter().find(|(bad, _)| *bad == c) {
            Some((_, good)) => result.push_str(good),
            None => result.push(c),
        }
    }
    result.trim().to_string()
}
