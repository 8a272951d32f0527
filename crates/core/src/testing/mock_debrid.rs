//! Mock debrid client for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::debrid::{
    AddTorrentResponse, AvailableHost, DebridClient, DebridError, FileGroup, FileSelection,
    TorrentFile, TorrentInfo, TorrentStatus,
};

/// Mock implementation of the DebridClient trait.
///
/// Every call is recorded as `"<method>:<args>"` for assertions. Status
/// sequences are scripted: each `torrent_info` call pops the next status and
/// the last one repeats.
///
/// # Example
///
/// ```rust,ignore
/// let client = MockDebridClient::new();
/// client.set_statuses(vec![TorrentStatus::Queued, TorrentStatus::Downloaded]).await;
/// client.set_info("Movie", "Movie.mkv", vec![(1, "/Movie.mkv", 1000)]).await;
/// ```
#[derive(Debug)]
pub struct MockDebridClient {
    calls: Arc<RwLock<Vec<String>>>,
    availability: Arc<RwLock<HashMap<String, Vec<FileGroup>>>>,
    hosts: Arc<RwLock<Vec<String>>>,
    statuses: Arc<RwLock<VecDeque<TorrentStatus>>>,
    info: Arc<RwLock<TorrentInfo>>,
    id_counter: Arc<RwLock<u32>>,
}

impl Default for MockDebridClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDebridClient {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            availability: Arc::new(RwLock::new(HashMap::new())),
            hosts: Arc::new(RwLock::new(vec!["mock.host".to_string()])),
            statuses: Arc::new(RwLock::new(VecDeque::from([TorrentStatus::Downloaded]))),
            info: Arc::new(RwLock::new(TorrentInfo {
                id: String::new(),
                filename: String::new(),
                original_filename: String::new(),
                hash: String::new(),
                bytes: 0,
                progress: 0.0,
                status: TorrentStatus::Queued,
                files: Vec::new(),
                links: Vec::new(),
            })),
            id_counter: Arc::new(RwLock::new(0)),
        }
    }

    /// Mark a hash as instantly available with the given file groups.
    pub async fn set_availability(&self, hash: &str, groups: Vec<FileGroup>) {
        self.availability
            .write()
            .await
            .insert(hash.to_string(), groups);
    }

    pub async fn set_hosts(&self, hosts: Vec<String>) {
        *self.hosts.write().await = hosts;
    }

    /// Script the statuses returned by successive `torrent_info` calls.
    pub async fn set_statuses(&self, statuses: Vec<TorrentStatus>) {
        *self.statuses.write().await = statuses.into();
    }

    /// Set the names and file listing reported by `torrent_info`.
    pub async fn set_info(
        &self,
        filename: &str,
        original_filename: &str,
        files: Vec<(u64, &str, u64)>,
    ) {
        let mut info = self.info.write().await;
        info.filename = filename.to_string();
        info.original_filename = original_filename.to_string();
        info.files = files
            .into_iter()
            .map(|(id, path, bytes)| TorrentFile {
                id,
                path: path.to_string(),
                bytes,
                selected: 0,
            })
            .collect();
        info.bytes = info.files.iter().map(|f| f.bytes).sum();
    }

    /// All recorded calls, in order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    /// Number of recorded calls to `method`.
    pub async fn call_count(&self, method: &str) -> usize {
        let prefix = format!("{}:", method);
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| *c == method || c.starts_with(&prefix))
            .count()
    }

    async fn record(&self, call: String) {
        self.calls.write().await.push(call);
    }

    async fn next_id(&self) -> String {
        let mut counter = self.id_counter.write().await;
        *counter += 1;
        format!("MOCKJOB{}", *counter)
    }
}

#[async_trait]
impl DebridClient for MockDebridClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn instant_availability(
        &self,
        hash: &str,
    ) -> Result<Option<Vec<FileGroup>>, DebridError> {
        self.record(format!("instant_availability:{}", hash)).await;
        Ok(self.availability.read().await.get(hash).cloned())
    }

    async fn available_hosts(&self) -> Result<Vec<AvailableHost>, DebridError> {
        self.record("available_hosts".to_string()).await;
        Ok(self
            .hosts
            .read()
            .await
            .iter()
            .map(|host| AvailableHost {
                host: host.clone(),
                max_file_size: None,
            })
            .collect())
    }

    async fn add_torrent(
        &self,
        host: &str,
        _data: Vec<u8>,
    ) -> Result<AddTorrentResponse, DebridError> {
        self.record(format!("add_torrent:{}", host)).await;
        let id = self.next_id().await;
        Ok(AddTorrentResponse {
            uri: format!("https://mock/torrents/info/{}", id),
            id,
        })
    }

    async fn add_magnet(
        &self,
        host: &str,
        magnet: &str,
    ) -> Result<AddTorrentResponse, DebridError> {
        self.record(format!("add_magnet:{}:{}", host, magnet)).await;
        let id = self.next_id().await;
        Ok(AddTorrentResponse {
            uri: format!("https://mock/torrents/info/{}", id),
            id,
        })
    }

    async fn torrent_info(&self, id: &str) -> Result<TorrentInfo, DebridError> {
        self.record(format!("torrent_info:{}", id)).await;

        let status = {
            let mut statuses = self.statuses.write().await;
            if statuses.len() > 1 {
                statuses.pop_front()
            } else {
                statuses.front().copied()
            }
        }
        .unwrap_or(TorrentStatus::Unknown);

        let mut info = self.info.read().await.clone();
        info.id = id.to_string();
        info.status = status;
        info.progress = if status == TorrentStatus::Downloaded {
            100.0
        } else {
            0.0
        };
        Ok(info)
    }

    async fn select_files(&self, id: &str, files: &FileSelection) -> Result<(), DebridError> {
        self.record(format!("select_files:{}:{}", id, files.to_form_value()))
            .await;
        Ok(())
    }

    async fn delete_torrent(&self, id: &str) -> Result<(), DebridError> {
        self.record(format!("delete_torrent:{}", id)).await;
        Ok(())
    }
}
