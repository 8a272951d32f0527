//! Per-item processing.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::alert::AlertSink;
use crate::config::BlackholeConfig;
use crate::debrid::{DebridClient, TorrentInfo};
use crate::descriptor::Descriptor;
use crate::linker::{apply_links, plan_links, season, LinkError, LinkPlan};
use crate::manager::{clean_file_name, ManagerKind, MediaManager};
use crate::metrics;
use crate::mount::MountResolver;
use crate::poller::{BudgetEvent, PollAction, PollMachine};
use crate::probe::{probe_readable, ProbeResult};
use crate::selection::{plan_selection, SelectionPlan};
use crate::submission::{RemoteJob, SubmissionStrategy};

use super::types::{FailReason, ItemOutcome, ProcessError};

/// Movies always take the largest file; so do single-episode releases.
pub fn only_largest_file(kind: ManagerKind, raw_filename: &str) -> bool {
    kind == ManagerKind::Radarr || season::is_episode(raw_filename)
}

/// Runs units of work against shared clients.
#[derive(Clone)]
pub struct ItemProcessor {
    debrid: Arc<dyn DebridClient>,
    manager: Arc<dyn MediaManager>,
    alerts: Arc<dyn AlertSink>,
    kind: ManagerKind,
    config: BlackholeConfig,
}

impl ItemProcessor {
    pub fn new(
        debrid: Arc<dyn DebridClient>,
        manager: Arc<dyn MediaManager>,
        alerts: Arc<dyn AlertSink>,
        kind: ManagerKind,
        config: BlackholeConfig,
    ) -> Self {
        Self {
            debrid,
            manager,
            alerts,
            kind,
            config,
        }
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(self.config.poll_interval_ms)
    }

    /// Process one claimed descriptor inside its own logging span.
    ///
    /// The claimed file is removed after any regular outcome and kept when an
    /// error escapes.
    pub async fn process(&self, descriptor: &Descriptor) -> Result<ItemOutcome, ProcessError> {
        let span = info_span!("item", item = %descriptor.stem);
        async {
            info!(kind = ?descriptor.kind, "Processing");
            let outcome = self.process_inner(descriptor).await?;
            tokio::fs::remove_file(&descriptor.processing_path).await?;
            info!(outcome = outcome.as_str(), "Finished");
            Ok::<_, ProcessError>(outcome)
        }
        .instrument(span)
        .await
    }

    async fn process_inner(&self, descriptor: &Descriptor) -> Result<ItemOutcome, ProcessError> {
        let strategy = SubmissionStrategy::load(descriptor).await?;
        let mut job = RemoteJob::new(
            Arc::clone(&self.debrid),
            strategy,
            self.config.fail_if_not_cached,
            only_largest_file(self.kind, &descriptor.raw_filename),
        );

        if !job.submit().await? {
            info!("Content is not cached");
            self.fail_item(&mut job, descriptor).await?;
            return Ok(ItemOutcome::Failed(FailReason::NotCached));
        }

        self.poll(&mut job, descriptor).await
    }

    /// Drive the remote job until it reaches a terminal decision.
    async fn poll(
        &self,
        job: &mut RemoteJob,
        descriptor: &Descriptor,
    ) -> Result<ItemOutcome, ProcessError> {
        let mut machine = PollMachine::new(
            job.fail_if_not_cached,
            job.incompatible_hash()?,
            self.config.warn_after_polls,
            self.config.wait_for_torrent_timeout,
        );

        loop {
            let info = job.info().await?;
            metrics::STATUS_POLLS
                .with_label_values(&[info.status.as_str()])
                .inc();

            match machine.on_status(info.status, info.progress) {
                PollAction::SelectFiles => {
                    if !self.select_files(job, &info).await? {
                        job.delete().await?;
                        self.fail_item(job, descriptor).await?;
                        return Ok(ItemOutcome::Failed(FailReason::SelectionRejected));
                    }
                }
                PollAction::Progress(progress) => {
                    info!(status = info.status.as_str(), progress, "Waiting for remote job");
                }
                PollAction::AbortUncached => {
                    info!("Non-cached job with an unverifiable hash");
                    job.delete().await?;
                    self.fail_item(job, descriptor).await?;
                    return Ok(ItemOutcome::Failed(FailReason::Unverifiable));
                }
                PollAction::Fail => {
                    warn!(status = info.status.as_str(), "Remote job failed");
                    self.fail_item(job, descriptor).await?;
                    return Ok(ItemOutcome::Failed(FailReason::RemoteFailure));
                }
                PollAction::Resolve => return self.publish(descriptor, &info).await,
                PollAction::Idle => {
                    debug!(status = info.status.as_str(), "Unrecognized status");
                }
            }

            match machine.budget() {
                Some(BudgetEvent::Slow) => {
                    warn!(polls = machine.polls(), "Remote job is slow");
                    self.alerts
                        .notify_error(
                            &format!(
                                "{} still waiting after {} status checks",
                                descriptor.stem,
                                machine.polls()
                            ),
                            info.status.as_str(),
                        )
                        .await;
                }
                Some(BudgetEvent::TimedOut) => {
                    warn!(polls = machine.polls(), "Giving up on remote job");
                    self.fail_item(job, descriptor).await?;
                    return Ok(ItemOutcome::Failed(FailReason::TimedOut));
                }
                None => {}
            }

            tokio::time::sleep(self.interval()).await;
        }
    }

    /// Apply the selection policy; `false` means nothing acceptable can be selected.
    async fn select_files(
        &self,
        job: &mut RemoteJob,
        info: &TorrentInfo,
    ) -> Result<bool, ProcessError> {
        let availability = if job.fail_if_not_cached && !job.incompatible_hash()? {
            Some(job.check_availability(false).await?)
        } else {
            None
        };

        let plan = plan_selection(
            &info.files,
            job.only_largest_file,
            availability.as_ref().map(|a| a.groups()),
        );

        match plan {
            SelectionPlan::NoMediaFiles => {
                info!("No media files found");
                Ok(false)
            }
            SelectionPlan::NotCached { extra_files_group } => {
                if let Some(group) = extra_files_group {
                    let ids: Vec<&str> = group.iter().map(String::as_str).collect();
                    info!(files = %ids.join(","), "Extra files required for cache");
                    self.alerts
                        .notify("Extra files required for cache", &ids.join(", "))
                        .await;
                }
                Ok(false)
            }
            SelectionPlan::Select { ids, largest_only } => {
                if let Some(path) = largest_only {
                    info!(path = %path, "Selecting largest file only");
                    self.alerts.notify("Largest file", &path).await;
                }
                job.select_files(ids).await?;
                Ok(true)
            }
        }
    }

    /// Find the mounted folder and link it into the completed tree.
    async fn publish(
        &self,
        descriptor: &Descriptor,
        info: &TorrentInfo,
    ) -> Result<ItemOutcome, ProcessError> {
        info!("Waiting for folders to refresh");
        let resolver = MountResolver::new(
            &self.config.mount_torrents_path,
            self.config.wait_for_torrent_timeout,
            self.interval(),
            self.config.mount_refresh_secs + 1,
        );

        let Some(folder) = resolver
            .resolve(info, &descriptor.expected_mount_path)
            .await
        else {
            warn!("Torrent folder not found in filesystem");
            self.alerts
                .notify_error("Torrent folder not found in filesystem", &descriptor.stem)
                .await;
            return Ok(ItemOutcome::FolderNotFound);
        };

        if descriptor.is_published() {
            return Err(LinkError::DestinationExists(descriptor.destination_folder.clone()).into());
        }

        let plans = plan_links(&folder, &descriptor.destination_folder, &descriptor.stem)?;
        if self.config.probe_accessibility {
            self.probe(&plans).await;
        }
        let links = apply_links(&plans).await?;
        // Season packs may link nothing here; the folder still marks the item published.
        tokio::fs::create_dir_all(&descriptor.destination_folder).await?;
        info!(links, folder = %folder.display(), "Published");

        self.alerts
            .notify(
                &format!("Successfully processed {}", descriptor.stem),
                "Now available for immediate consumption!",
            )
            .await;
        self.refresh_manager().await;

        Ok(ItemOutcome::Published { links })
    }

    /// Informational readability check of every source file.
    async fn probe(&self, plans: &[LinkPlan]) {
        let timeout = Duration::from_secs(self.config.probe_timeout_secs);
        for plan in plans {
            let result = probe_readable(&plan.source, timeout).await;
            if result.is_readable() {
                continue;
            }
            let name = file_name(&plan.source);
            match result {
                ProbeResult::TimedOut => {
                    warn!(file = %name, "Timeout reached when accessing file");
                    self.alerts
                        .notify_error("Timeout reached when accessing file", &name)
                        .await;
                }
                ProbeResult::Failed(e) => {
                    warn!(file = %name, "Failed to read file: {}", e);
                    self.alerts
                        .notify_error("Failed to read mounted file", &format!("{}: {}", name, e))
                        .await;
                }
                ProbeResult::Readable => {}
            }
        }
    }

    /// Best-effort nudges so the manager picks up the new links.
    async fn refresh_manager(&self) {
        for attempt in 0..self.config.refresh_count {
            if let Err(e) = self.manager.refresh_monitored_downloads().await {
                warn!("Failed to refresh {}: {}", self.manager.name(), e);
            }
            if attempt + 1 < self.config.refresh_count {
                tokio::time::sleep(self.interval()).await;
            }
        }
    }

    /// Fail every history record that belongs to this item.
    ///
    /// Records match by info-hash or by cleaned source title.
    async fn fail_item(
        &self,
        job: &mut RemoteJob,
        descriptor: &Descriptor,
    ) -> Result<(), ProcessError> {
        let hash = job.hash()?;
        let stem = descriptor.stem.to_lowercase();

        let history = self
            .manager
            .history(self.config.history_page_size)
            .await?;

        let ids: Vec<u64> = history
            .records
            .iter()
            .filter(|record| {
                let hash_matches = record
                    .data
                    .torrent_info_hash
                    .as_deref()
                    .is_some_and(|h| h.eq_ignore_ascii_case(&hash));
                hash_matches || clean_file_name(&record.source_title.to_lowercase()) == stem
            })
            .map(|record| record.id)
            .collect();

        if ids.is_empty() {
            return Err(ProcessError::NoHistoryMatch(descriptor.stem.clone()));
        }

        for id in &ids {
            self.manager.fail_history_item(*id).await?;
        }
        info!(count = ids.len(), "Failed history items");

        Ok(())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debrid::TorrentStatus;
    use crate::testing::fixtures::{blackhole_config, magnet, mount_file, torrent_bytes};
    use crate::testing::{MockDebridClient, MockMediaManager, RecordingAlertSink};
    use tempfile::TempDir;

    const HASH: &str = "0123456789abcdef0123456789abcdef01234567";

    struct Harness {
        watch: TempDir,
        mount: TempDir,
        debrid: Arc<MockDebridClient>,
        manager: Arc<MockMediaManager>,
        alerts: Arc<RecordingAlertSink>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                watch: tempfile::tempdir().unwrap(),
                mount: tempfile::tempdir().unwrap(),
                debrid: Arc::new(MockDebridClient::new()),
                manager: Arc::new(MockMediaManager::new()),
                alerts: Arc::new(RecordingAlertSink::new()),
            }
        }

        fn processor(&self, kind: ManagerKind, fail_if_not_cached: bool) -> ItemProcessor {
            let mut config = blackhole_config(self.watch.path(), self.mount.path());
            config.fail_if_not_cached = fail_if_not_cached;
            ItemProcessor::new(
                self.debrid.clone(),
                self.manager.clone(),
                self.alerts.clone(),
                kind,
                config,
            )
        }

        /// Write a claimed descriptor into the processing folder.
        fn claim(&self, filename: &str, content: &[u8]) -> Descriptor {
            let descriptor =
                Descriptor::from_filename(filename, self.watch.path(), self.mount.path()).unwrap();
            std::fs::create_dir_all(descriptor.processing_path.parent().unwrap()).unwrap();
            std::fs::write(&descriptor.processing_path, content).unwrap();
            descriptor
        }
    }

    fn group(ids: &[&str]) -> crate::debrid::FileGroup {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_only_largest_file_policy() {
        assert!(only_largest_file(ManagerKind::Radarr, "Movie.2020.torrent"));
        assert!(only_largest_file(ManagerKind::Sonarr, "Show.S01E02.magnet"));
        assert!(!only_largest_file(ManagerKind::Sonarr, "Show.S01.magnet"));
    }

    #[tokio::test]
    async fn test_happy_path_publishes_without_failing() {
        let h = Harness::new();
        h.debrid
            .set_statuses(vec![
                TorrentStatus::Queued,
                TorrentStatus::Downloading,
                TorrentStatus::Downloaded,
            ])
            .await;
        h.debrid.set_info("Movie.2020", "Movie.2020", Vec::new()).await;
        mount_file(h.mount.path(), "Movie.2020", "Movie.2020.mkv");

        let descriptor = h.claim("Movie.2020.magnet", magnet(HASH, "Movie.2020").as_bytes());
        let outcome = h
            .processor(ManagerKind::Radarr, false)
            .process(&descriptor)
            .await
            .unwrap();

        assert_eq!(outcome, ItemOutcome::Published { links: 1 });
        assert!(h.manager.failed_ids().await.is_empty());
        assert_eq!(h.manager.refresh_count().await, 2);
        assert!(!descriptor.processing_path.exists());
        assert!(descriptor.destination_folder.join("Movie.2020.mkv").exists());
        assert!(h.alerts.has_title("Successfully processed Movie.2020").await);
    }

    #[tokio::test]
    async fn test_remote_error_fails_history_once() {
        let h = Harness::new();
        h.debrid.set_statuses(vec![TorrentStatus::Error]).await;
        h.manager.add_history(7, "Movie.2020", Some(HASH)).await;
        h.manager.add_history(8, "Other", Some("ffff")).await;

        let descriptor = h.claim("Movie.2020.magnet", magnet(HASH, "x").as_bytes());
        let outcome = h
            .processor(ManagerKind::Radarr, false)
            .process(&descriptor)
            .await
            .unwrap();

        assert_eq!(outcome, ItemOutcome::Failed(FailReason::RemoteFailure));
        assert_eq!(h.manager.failed_ids().await, vec![7]);
        assert!(!descriptor.processing_path.exists());
    }

    #[tokio::test]
    async fn test_history_matches_by_clean_title() {
        let h = Harness::new();
        h.debrid.set_statuses(vec![TorrentStatus::Dead]).await;
        h.manager.add_history(3, "Movie: The Sequel", None).await;

        let descriptor = h.claim("movie the sequel.magnet", magnet(HASH, "x").as_bytes());
        h.processor(ManagerKind::Radarr, false)
            .process(&descriptor)
            .await
            .unwrap();

        assert_eq!(h.manager.failed_ids().await, vec![3]);
    }

    #[tokio::test]
    async fn test_no_history_match_is_an_error() {
        let h = Harness::new();
        h.debrid.set_statuses(vec![TorrentStatus::Virus]).await;

        let descriptor = h.claim("Unknown.magnet", magnet(HASH, "x").as_bytes());
        let result = h
            .processor(ManagerKind::Radarr, false)
            .process(&descriptor)
            .await;

        assert!(matches!(result, Err(ProcessError::NoHistoryMatch(_))));
        assert!(descriptor.processing_path.exists());
    }

    #[tokio::test]
    async fn test_uncached_content_is_never_submitted() {
        let h = Harness::new();
        h.manager.add_history(1, "Movie", Some(HASH)).await;

        let descriptor = h.claim("Movie.magnet", magnet(HASH, "Movie").as_bytes());
        let outcome = h
            .processor(ManagerKind::Radarr, true)
            .process(&descriptor)
            .await
            .unwrap();

        assert_eq!(outcome, ItemOutcome::Failed(FailReason::NotCached));
        assert_eq!(h.debrid.call_count("add_magnet").await, 0);
        assert_eq!(h.manager.failed_ids().await, vec![1]);
    }

    #[tokio::test]
    async fn test_cached_selection_of_largest_file() {
        let h = Harness::new();
        h.debrid.set_availability(HASH, vec![group(&["1"])]).await;
        h.debrid
            .set_statuses(vec![
                TorrentStatus::WaitingFilesSelection,
                TorrentStatus::Downloaded,
            ])
            .await;
        h.debrid
            .set_info(
                "Movie",
                "Movie",
                vec![(1, "/Movie.mkv", 5_000), (2, "/Sample.mkv", 10)],
            )
            .await;
        mount_file(h.mount.path(), "Movie", "Movie.mkv");

        let descriptor = h.claim("Movie.magnet", magnet(HASH, "Movie").as_bytes());
        let outcome = h
            .processor(ManagerKind::Radarr, true)
            .process(&descriptor)
            .await
            .unwrap();

        assert_eq!(outcome, ItemOutcome::Published { links: 1 });
        let calls = h.debrid.calls().await;
        assert!(calls.contains(&"select_files:MOCKJOB1:1".to_string()));
        assert!(h.alerts.has_title("Largest file").await);
    }

    #[tokio::test]
    async fn test_extra_files_required_deletes_and_fails() {
        let h = Harness::new();
        h.debrid.set_availability(HASH, vec![group(&["1", "2"])]).await;
        h.debrid
            .set_statuses(vec![TorrentStatus::WaitingFilesSelection])
            .await;
        h.debrid
            .set_info(
                "Movie",
                "Movie",
                vec![(1, "/Movie.mkv", 5_000), (2, "/Sample.mkv", 10)],
            )
            .await;
        h.manager.add_history(4, "Movie", Some(HASH)).await;

        let descriptor = h.claim("Movie.magnet", magnet(HASH, "Movie").as_bytes());
        let outcome = h
            .processor(ManagerKind::Radarr, true)
            .process(&descriptor)
            .await
            .unwrap();

        assert_eq!(outcome, ItemOutcome::Failed(FailReason::SelectionRejected));
        assert_eq!(h.debrid.call_count("delete_torrent").await, 1);
        assert_eq!(h.debrid.call_count("select_files").await, 0);
        assert!(h.alerts.has_title("Extra files required for cache").await);
        assert_eq!(h.manager.failed_ids().await, vec![4]);
    }

    #[tokio::test]
    async fn test_unverifiable_hash_aborts_while_downloading() {
        let h = Harness::new();
        h.debrid.set_statuses(vec![TorrentStatus::MagnetConversion]).await;
        h.manager.add_history(9, "Show S01", None).await;

        let descriptor = h.claim("Show S01.magnet", magnet("base32hash", "Show").as_bytes());
        let outcome = h
            .processor(ManagerKind::Sonarr, true)
            .process(&descriptor)
            .await
            .unwrap();

        assert_eq!(outcome, ItemOutcome::Failed(FailReason::Unverifiable));
        assert_eq!(h.debrid.call_count("delete_torrent").await, 1);
        assert_eq!(h.manager.failed_ids().await, vec![9]);
    }

    #[tokio::test]
    async fn test_poll_budget_warns_then_times_out() {
        let h = Harness::new();
        h.debrid.set_availability(HASH, vec![group(&["1"])]).await;
        h.debrid.set_statuses(vec![TorrentStatus::Downloading]).await;
        h.manager.add_history(2, "Slow", Some(HASH)).await;

        let descriptor = h.claim("Slow.magnet", magnet(HASH, "Slow").as_bytes());
        let outcome = h
            .processor(ManagerKind::Radarr, true)
            .process(&descriptor)
            .await
            .unwrap();

        assert_eq!(outcome, ItemOutcome::Failed(FailReason::TimedOut));
        assert!(h.alerts.has_title("still waiting after 3 status checks").await);
        assert_eq!(h.debrid.call_count("torrent_info").await, 5);
        assert_eq!(h.debrid.call_count("delete_torrent").await, 0);
    }

    #[tokio::test]
    async fn test_missing_mount_folder() {
        let h = Harness::new();
        h.debrid.set_info("Gone", "Gone", Vec::new()).await;

        let descriptor = h.claim("Gone.torrent", &torrent_bytes("Gone.mkv"));
        let outcome = h
            .processor(ManagerKind::Radarr, false)
            .process(&descriptor)
            .await
            .unwrap();

        assert_eq!(outcome, ItemOutcome::FolderNotFound);
        assert!(h.alerts.has_title("Torrent folder not found in filesystem").await);
        assert!(!descriptor.processing_path.exists());
        assert!(!descriptor.destination_folder.exists());
    }

    #[tokio::test]
    async fn test_multi_season_pack_is_split() {
        let h = Harness::new();
        h.debrid.set_info("Show.Pack", "Show.Pack", Vec::new()).await;
        mount_file(h.mount.path(), "Show.Pack", "Show.S02E04.mkv");

        let descriptor = h.claim("Show Season 1-3.torrent", &torrent_bytes("Show"));
        h.processor(ManagerKind::Sonarr, false)
            .process(&descriptor)
            .await
            .unwrap();

        let link = h
            .watch
            .path()
            .join("completed/Show Season 2/Show.S02E04.mkv");
        assert!(std::fs::symlink_metadata(link).is_ok());
        assert!(descriptor.is_published());
    }

    #[tokio::test]
    async fn test_existing_destination_is_not_overwritten() {
        let h = Harness::new();
        h.debrid.set_info("Movie", "Movie", Vec::new()).await;
        mount_file(h.mount.path(), "Movie", "Movie.mkv");

        let descriptor = h.claim("Movie.torrent", &torrent_bytes("Movie.mkv"));
        std::fs::create_dir_all(&descriptor.destination_folder).unwrap();

        let result = h
            .processor(ManagerKind::Radarr, false)
            .process(&descriptor)
            .await;
        assert!(matches!(
            result,
            Err(ProcessError::Link(LinkError::DestinationExists(_)))
        ));
        assert!(!descriptor.destination_folder.join("Movie.mkv").exists());
    }
}
