//! Submitting descriptors to the debrid service.

mod hash;
mod job;

use thiserror::Error;

use crate::debrid::{DebridClient, DebridError};
use crate::descriptor::{Descriptor, DescriptorKind};

pub use hash::{magnet_hash, torrent_info_hash, INFO_HASH_LEN};
pub use job::{Availability, RemoteJob};

/// Errors raised while submitting or driving a remote job.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Remote job has no id yet")]
    MissingId,

    #[error("Remote job was already submitted as {0}")]
    AlreadySubmitted(String),

    #[error("No available host to submit to")]
    NoAvailableHost,

    #[error("Invalid torrent file: {0}")]
    InvalidTorrent(String),

    #[error("Magnet link has no btih parameter")]
    MissingMagnetHash,

    #[error("Failed to read descriptor: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Debrid(#[from] DebridError),
}

/// How a descriptor's content reaches the service.
#[derive(Debug, Clone)]
pub enum SubmissionStrategy {
    /// Raw metainfo bytes, uploaded as-is.
    TorrentFile(Vec<u8>),
    /// Magnet URI text.
    Magnet(String),
}

impl SubmissionStrategy {
    /// Read the claimed descriptor once and keep its content.
    pub async fn load(descriptor: &Descriptor) -> Result<Self, SubmissionError> {
        let bytes = tokio::fs::read(&descriptor.processing_path).await?;
        Ok(match descriptor.kind {
            DescriptorKind::TorrentFile => SubmissionStrategy::TorrentFile(bytes),
            DescriptorKind::Magnet => {
                SubmissionStrategy::Magnet(String::from_utf8_lossy(&bytes).into_owned())
            }
        })
    }

    pub fn compute_hash(&self) -> Result<String, SubmissionError> {
        match self {
            SubmissionStrategy::TorrentFile(data) => torrent_info_hash(data),
            SubmissionStrategy::Magnet(magnet) => magnet_hash(magnet),
        }
    }

    /// Create the remote job bound to `host`, returning its id.
    pub async fn submit(
        &self,
        client: &dyn DebridClient,
        host: &str,
    ) -> Result<String, SubmissionError> {
        let response = match self {
            SubmissionStrategy::TorrentFile(data) => client.add_torrent(host, data.clone()).await?,
            SubmissionStrategy::Magnet(magnet) => client.add_magnet(host, magnet.trim()).await?,
        };
        Ok(response.id)
    }
}
