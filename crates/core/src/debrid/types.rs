//! Types for debrid service operations.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to the debrid service.
#[derive(Debug, Error)]
pub enum DebridError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Torrent not found: {0}")]
    TorrentNotFound(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Lifecycle status of a remote torrent job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentStatus {
    /// File listing is known, waiting for a selection.
    WaitingFilesSelection,
    /// Magnet metadata is being resolved.
    MagnetConversion,
    Queued,
    Downloading,
    Compressing,
    Uploading,
    /// Content is available on the mount.
    Downloaded,
    MagnetError,
    Error,
    Dead,
    Virus,
    /// Any status this client does not know about.
    #[serde(other)]
    Unknown,
}

impl TorrentStatus {
    /// Returns the string representation used by the service.
    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentStatus::WaitingFilesSelection => "waiting_files_selection",
            TorrentStatus::MagnetConversion => "magnet_conversion",
            TorrentStatus::Queued => "queued",
            TorrentStatus::Downloading => "downloading",
            TorrentStatus::Compressing => "compressing",
            TorrentStatus::Uploading => "uploading",
            TorrentStatus::Downloaded => "downloaded",
            TorrentStatus::MagnetError => "magnet_error",
            TorrentStatus::Error => "error",
            TorrentStatus::Dead => "dead",
            TorrentStatus::Virus => "virus",
            TorrentStatus::Unknown => "unknown",
        }
    }

    /// The job is moving towards `downloaded` and reports progress.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            TorrentStatus::MagnetConversion
                | TorrentStatus::Queued
                | TorrentStatus::Downloading
                | TorrentStatus::Compressing
                | TorrentStatus::Uploading
        )
    }

    /// The job ended in a state it cannot recover from.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TorrentStatus::MagnetError
                | TorrentStatus::Error
                | TorrentStatus::Dead
                | TorrentStatus::Virus
        )
    }
}

/// A file inside a remote torrent job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentFile {
    pub id: u64,
    /// Path relative to the torrent root, with a leading slash.
    pub path: String,
    pub bytes: u64,
    #[serde(default)]
    pub selected: u8,
}

/// Remote job details, as returned by `torrents/info/<id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentInfo {
    pub id: String,
    /// Name the service uses for the finished folder.
    pub filename: String,
    #[serde(default)]
    pub original_filename: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub bytes: u64,
    /// Progress percentage (0 - 100).
    #[serde(default)]
    pub progress: f64,
    pub status: TorrentStatus,
    #[serde(default)]
    pub files: Vec<TorrentFile>,
    #[serde(default)]
    pub links: Vec<String>,
}

/// Response to a torrent or magnet submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTorrentResponse {
    pub id: String,
    #[serde(default)]
    pub uri: String,
}

/// A host the service can download to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableHost {
    pub host: String,
    #[serde(default)]
    pub max_file_size: Option<u64>,
}

/// A combination of file ids that can be served instantly.
pub type FileGroup = BTreeSet<String>;

/// File ids to materialize for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSelection(pub Vec<String>);

impl FileSelection {
    /// Value for the `files` form field.
    pub fn to_form_value(&self) -> String {
        self.0.join(",")
    }
}

/// Trait for debrid service backends.
#[async_trait]
pub trait DebridClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// File groups instantly servable for a hash, `None` when nothing is cached.
    async fn instant_availability(
        &self,
        hash: &str,
    ) -> Result<Option<Vec<FileGroup>>, DebridError>;

    /// Hosts a new torrent can be bound to.
    async fn available_hosts(&self) -> Result<Vec<AvailableHost>, DebridError>;

    /// Upload raw .torrent bytes.
    async fn add_torrent(
        &self,
        host: &str,
        data: Vec<u8>,
    ) -> Result<AddTorrentResponse, DebridError>;

    /// Submit a magnet URI.
    async fn add_magnet(&self, host: &str, magnet: &str)
        -> Result<AddTorrentResponse, DebridError>;

    /// Fetch fresh job details.
    async fn torrent_info(&self, id: &str) -> Result<TorrentInfo, DebridError>;

    /// Choose the files to materialize.
    async fn select_files(&self, id: &str, files: &FileSelection) -> Result<(), DebridError>;

    /// Delete a job.
    async fn delete_torrent(&self, id: &str) -> Result<(), DebridError>;
}
