//! Mock media manager for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::manager::{HistoryData, HistoryPage, HistoryRecord, ManagerError, MediaManager};

/// Mock implementation of the MediaManager trait.
///
/// Serves a fixed history and records which records were failed and how
/// often a refresh was requested.
#[derive(Debug, Default)]
pub struct MockMediaManager {
    history: Arc<RwLock<Vec<HistoryRecord>>>,
    failed: Arc<RwLock<Vec<u64>>>,
    refreshes: Arc<RwLock<u32>>,
}

impl MockMediaManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a grabbed history record.
    pub async fn add_history(&self, id: u64, source_title: &str, info_hash: Option<&str>) {
        self.history.write().await.push(HistoryRecord {
            id,
            source_title: source_title.to_string(),
            event_type: Some("grabbed".to_string()),
            data: HistoryData {
                torrent_info_hash: info_hash.map(str::to_string),
            },
        });
    }

    /// Ids passed to `fail_history_item`, in order.
    pub async fn failed_ids(&self) -> Vec<u64> {
        self.failed.read().await.clone()
    }

    pub async fn refresh_count(&self) -> u32 {
        *self.refreshes.read().await
    }
}

#[async_trait]
impl MediaManager for MockMediaManager {
    fn name(&self) -> &str {
        "mock"
    }

    async fn refresh_monitored_downloads(&self) -> Result<(), ManagerError> {
        *self.refreshes.write().await += 1;
        Ok(())
    }

    async fn history(&self, page_size: u32) -> Result<HistoryPage, ManagerError> {
        let records = self
            .history
            .read()
            .await
            .iter()
            .take(page_size as usize)
            .cloned()
            .collect();
        Ok(HistoryPage { records })
    }

    async fn fail_history_item(&self, id: u64) -> Result<(), ManagerError> {
        self.failed.write().await.push(id);
        Ok(())
    }
}
