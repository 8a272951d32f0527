//! Testing utilities and mock implementations.
//!
//! Mocks for every external seam (debrid service, media manager, alert
//! sink), so a whole unit of work or watch loop can run against a temporary
//! directory.
//!
//! # Example
//!
//! ```rust,ignore
//! use blackhole_core::testing::{MockDebridClient, MockMediaManager, RecordingAlertSink};
//!
//! let debrid = MockDebridClient::new();
//! debrid.set_statuses(vec![TorrentStatus::Queued, TorrentStatus::Downloaded]).await;
//!
//! let manager = MockMediaManager::new();
//! manager.add_history(7, "Movie.2020", Some(hash)).await;
//! ```

mod mock_debrid;
mod mock_manager;
mod recording_alerts;

pub use mock_debrid::MockDebridClient;
pub use mock_manager::MockMediaManager;
pub use recording_alerts::{AlertLevel, RecordedAlert, RecordingAlertSink};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::config::BlackholeConfig;

    /// Bencoded torrent with a single file named `name`.
    pub fn torrent_bytes(name: &str) -> Vec<u8> {
        format!(
            "d8:announce9:http://a/4:infod6:lengthi42e4:name{}:{}12:piece lengthi16384e6:pieces0:ee",
            name.len(),
            name
        )
        .into_bytes()
    }

    /// Magnet URI for `hash`.
    pub fn magnet(hash: &str, name: &str) -> String {
        format!("magnet:?xt=urn:btih:{}&dn={}", hash, name)
    }

    /// Processing config with instant ticks, rooted at `base` and `mount`.
    pub fn blackhole_config(base: &Path, mount: &Path) -> BlackholeConfig {
        BlackholeConfig {
            base_watch_path: base.to_path_buf(),
            radarr_path: "radarr".into(),
            sonarr_path: "sonarr".into(),
            mount_torrents_path: mount.to_path_buf(),
            fail_if_not_cached: true,
            wait_for_torrent_timeout: 5,
            mount_refresh_secs: 1,
            history_page_size: 500,
            poll_interval_ms: 1,
            warn_after_polls: 3,
            refresh_count: 2,
            probe_accessibility: false,
            probe_timeout_secs: 1,
        }
    }

    /// Create `<mount>/<folder>/<file>` with a few bytes of content.
    pub fn mount_file(mount: &Path, folder: &str, file: &str) {
        let path = mount.join(folder).join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create mount folder");
        }
        std::fs::write(path, b"media").expect("write mount file");
    }
}
