//! Watch loop implementation.

use std::any::Any;
use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::alert::AlertSink;
use crate::config::BlackholeConfig;
use crate::debrid::DebridClient;
use crate::descriptor::{Descriptor, COMPLETED_DIR, PROCESSING_DIR};
use crate::manager::{ManagerKind, MediaManager};
use crate::metrics;
use crate::processor::{ItemOutcome, ItemProcessor, ProcessError};

use super::types::{WatchError, WatchSummary};

type UnitResult = (String, Result<Result<ItemOutcome, ProcessError>, Box<dyn Any + Send>>);

/// Mutable state of one watch run.
#[derive(Default)]
struct RunState {
    tasks: JoinSet<UnitResult>,
    summary: WatchSummary,
    deferred: HashSet<String>,
}

/// Scans one manager's drop folder and runs claimed items.
pub struct WatchLoop {
    processor: ItemProcessor,
    alerts: Arc<dyn AlertSink>,
    kind: ManagerKind,
    watch_root: PathBuf,
    mount_root: PathBuf,
    interval: Duration,
}

impl WatchLoop {
    pub fn new(
        debrid: Arc<dyn DebridClient>,
        manager: Arc<dyn MediaManager>,
        alerts: Arc<dyn AlertSink>,
        kind: ManagerKind,
        config: BlackholeConfig,
    ) -> Self {
        let watch_root = config.watch_root(kind);
        let mount_root = config.mount_torrents_path.clone();
        let interval = Duration::from_millis(config.poll_interval_ms);
        let processor = ItemProcessor::new(debrid, manager, Arc::clone(&alerts), kind, config);

        Self {
            processor,
            alerts,
            kind,
            watch_root,
            mount_root,
            interval,
        }
    }

    /// Override the rescan interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn watch_root(&self) -> &PathBuf {
        &self.watch_root
    }

    /// Create the drop, processing and completed folders if missing.
    pub async fn ensure_dirs(&self) -> Result<(), WatchError> {
        for dir in [
            self.watch_root.clone(),
            self.watch_root.join(PROCESSING_DIR),
            self.watch_root.join(COMPLETED_DIR),
        ] {
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }

    /// Eligible descriptors currently in the drop folder, sorted by name.
    pub async fn scan(&self) -> Result<Vec<Descriptor>, WatchError> {
        let mut entries = tokio::fs::read_dir(&self.watch_root).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == PROCESSING_DIR || name == COMPLETED_DIR {
                continue;
            }
            if !entry.file_type().await?.is_file() {
                continue;
            }
            names.push(name);
        }
        names.sort();

        Ok(names
            .iter()
            .filter_map(|name| Descriptor::from_filename(name, &self.watch_root, &self.mount_root))
            .collect())
    }

    /// Drain the drop folder: keep scanning until every claimed item has
    /// finished and no new descriptors showed up.
    pub async fn run_until_idle(&self) -> Result<WatchSummary, WatchError> {
        self.ensure_dirs().await?;
        info!(manager = %self.kind, root = %self.watch_root.display(), "Draining drop folder");

        let mut state = RunState::default();
        let mut first = true;
        loop {
            let claimed = self.scan_and_spawn(&mut state).await?;
            if claimed == 0 && state.tasks.is_empty() {
                if first {
                    info!("No torrent files found");
                }
                break;
            }
            first = false;

            self.wait_reaping(&mut state).await;
        }

        info!(summary = ?state.summary, "Drop folder drained");
        Ok(state.summary)
    }

    /// Rescan forever until `shutdown` resolves, then let running items finish.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<WatchSummary, WatchError>
    where
        F: Future<Output = ()>,
    {
        self.ensure_dirs().await?;
        info!(manager = %self.kind, root = %self.watch_root.display(), "Watching drop folder");

        tokio::pin!(shutdown);
        let mut state = RunState::default();
        loop {
            if let Err(e) = self.scan_and_spawn(&mut state).await {
                warn!("Scan failed: {}", e);
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Watch loop received shutdown signal");
                    break;
                }
                _ = self.wait_reaping(&mut state) => {}
            }
        }

        if !state.tasks.is_empty() {
            info!(running = state.tasks.len(), "Waiting for running items to finish");
        }
        while let Some(joined) = state.tasks.join_next().await {
            self.record(joined, &mut state.summary).await;
        }

        info!(summary = ?state.summary, "Watch loop stopped");
        Ok(state.summary)
    }

    /// Claim every eligible descriptor and spawn its unit of work.
    async fn scan_and_spawn(&self, state: &mut RunState) -> Result<usize, WatchError> {
        let mut claimed = 0;

        for descriptor in self.scan().await? {
            if descriptor.is_published() {
                if state.deferred.insert(descriptor.raw_filename.clone()) {
                    metrics::ITEMS_DEFERRED.inc();
                    state.summary.deferred += 1;
                    warn!(
                        item = %descriptor.stem,
                        "Destination already exists, leaving descriptor in the drop folder"
                    );
                }
                continue;
            }

            if let Err(e) = tokio::fs::rename(&descriptor.source_path, &descriptor.processing_path).await
            {
                warn!(item = %descriptor.stem, "Failed to claim descriptor: {}", e);
                continue;
            }

            debug!(item = %descriptor.stem, "Claimed");
            metrics::ITEMS_CLAIMED
                .with_label_values(&[self.kind.as_str()])
                .inc();
            metrics::ACTIVE_UNITS.inc();
            state.summary.claimed += 1;
            claimed += 1;

            let processor = self.processor.clone();
            state.tasks.spawn(async move {
                let stem = descriptor.stem.clone();
                let result = AssertUnwindSafe(processor.process(&descriptor))
                    .catch_unwind()
                    .await;
                (stem, result)
            });
        }

        Ok(claimed)
    }

    /// Sleep one interval, recording units as they finish.
    async fn wait_reaping(&self, state: &mut RunState) {
        let deadline = tokio::time::sleep(self.interval);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => break,
                Some(joined) = state.tasks.join_next() => {
                    self.record(joined, &mut state.summary).await;
                }
            }
        }
    }

    async fn record(&self, joined: Result<UnitResult, JoinError>, summary: &mut WatchSummary) {
        metrics::ACTIVE_UNITS.dec();

        let (stem, detail) = match joined {
            Ok((_, Ok(Ok(outcome)))) => {
                metrics::ITEMS_FINISHED
                    .with_label_values(&[outcome.as_str()])
                    .inc();
                summary.record(&outcome);
                return;
            }
            Ok((stem, Ok(Err(e)))) => (stem, format!("{:?}", e)),
            Ok((stem, Err(panic))) => (stem, panic_message(panic.as_ref())),
            Err(e) => ("unknown item".to_string(), e.to_string()),
        };

        metrics::ITEMS_FINISHED
            .with_label_values(&["crashed"])
            .inc();
        summary.crashed += 1;
        error!(item = %stem, "Error processing {}: {}", stem, detail);
        self.alerts
            .notify_error(&format!("Error processing {}", stem), &detail)
            .await;
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}
