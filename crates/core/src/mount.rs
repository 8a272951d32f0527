//! Locating finished content on the debrid mount.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::debrid::TorrentInfo;

/// Extensions whose removal gives the folder name of a single-file job.
const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi", "m4v", "mov", "wmv", "ts", "webm"];

/// Searches the mount for the folder a finished job landed in.
#[derive(Debug, Clone)]
pub struct MountResolver {
    root: PathBuf,
    attempts: u32,
    interval: Duration,
    warn_after: u32,
}

impl MountResolver {
    /// `attempts` bounds the number of scans; a warning is logged once
    /// `warn_after` scans came up empty.
    pub fn new(root: impl Into<PathBuf>, attempts: u32, interval: Duration, warn_after: u32) -> Self {
        Self {
            root: root.into(),
            attempts,
            interval,
            warn_after,
        }
    }

    /// Candidate folders, highest priority first.
    pub fn candidates(&self, info: &TorrentInfo, expected_mount_path: &Path) -> Vec<PathBuf> {
        let mut candidates = Vec::with_capacity(4);

        if !info.filename.is_empty() {
            candidates.push(self.root.join(&info.filename));
        }
        if !info.original_filename.is_empty() {
            candidates.push(self.root.join(&info.original_filename));
            if let Some(stem) = strip_video_extension(&info.original_filename) {
                candidates.push(self.root.join(stem));
            }
        }
        candidates.push(expected_mount_path.to_path_buf());

        candidates
    }

    /// Rescan the candidates until one is a populated folder or attempts run out.
    pub async fn resolve(&self, info: &TorrentInfo, expected_mount_path: &Path) -> Option<PathBuf> {
        let candidates = self.candidates(info, expected_mount_path);

        for attempt in 1..=self.attempts {
            for candidate in &candidates {
                if is_populated_dir(candidate).await {
                    debug!(path = %candidate.display(), attempt, "Found mount folder");
                    return Some(candidate.clone());
                }
            }

            if attempt == self.warn_after {
                warn!(
                    "Mount folder for {} not visible after {} attempts",
                    info.filename, attempt
                );
            }

            if attempt < self.attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        None
    }
}

fn strip_video_extension(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    let is_video = VIDEO_EXTENSIONS
        .iter()
        .any(|v| v.eq_ignore_ascii_case(ext));
    (is_video && !stem.is_empty()).then_some(stem)
}

/// Exists, is a directory, and has at least one entry.
async fn is_populated_dir(path: &Path) -> bool {
    match tokio::fs::read_dir(path).await {
        Ok(mut entries) => matches!(entries.next_entry().await, Ok(Some(_))),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debrid::TorrentStatus;
    use crate::testing::fixtures::mount_file;

    fn info(filename: &str, original_filename: &str) -> TorrentInfo {
        TorrentInfo {
            id: "JOB".to_string(),
            filename: filename.to_string(),
            original_filename: original_filename.to_string(),
            hash: String::new(),
            bytes: 0,
            progress: 100.0,
            status: TorrentStatus::Downloaded,
            files: Vec::new(),
            links: Vec::new(),
        }
    }

    fn resolver(root: &Path, attempts: u32) -> MountResolver {
        MountResolver::new(root, attempts, Duration::from_millis(1), 2)
    }

    #[test]
    fn test_candidate_order() {
        let r = resolver(Path::new("/mnt"), 1);
        let candidates = r.candidates(
            &info("Movie.2020.mkv", "Movie.2020.mkv"),
            Path::new("/mnt/Movie 2020"),
        );
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/mnt/Movie.2020.mkv"),
                PathBuf::from("/mnt/Movie.2020.mkv"),
                PathBuf::from("/mnt/Movie.2020"),
                PathBuf::from("/mnt/Movie 2020"),
            ]
        );
    }

    #[test]
    fn test_no_extension_candidate_for_folders() {
        let r = resolver(Path::new("/mnt"), 1);
        let candidates = r.candidates(&info("Show.S01", "Show.S01"), Path::new("/mnt/x"));
        assert_eq!(candidates.len(), 3);
    }

    #[tokio::test]
    async fn test_resolve_prefers_populated_candidate() {
        let mount = tempfile::tempdir().unwrap();
        // Higher-priority candidate exists but is empty.
        std::fs::create_dir_all(mount.path().join("Movie.2020.mkv")).unwrap();
        mount_file(mount.path(), "Movie.2020", "Movie.2020.mkv");

        let found = resolver(mount.path(), 1)
            .resolve(
                &info("Movie.2020.mkv", "Movie.2020.mkv"),
                &mount.path().join("stem"),
            )
            .await;
        assert_eq!(found, Some(mount.path().join("Movie.2020")));
    }

    #[tokio::test]
    async fn test_resolve_honors_priority() {
        let mount = tempfile::tempdir().unwrap();
        mount_file(mount.path(), "renamed", "a.mkv");
        mount_file(mount.path(), "stem", "a.mkv");

        let found = resolver(mount.path(), 1)
            .resolve(&info("renamed", "original"), &mount.path().join("stem"))
            .await;
        assert_eq!(found, Some(mount.path().join("renamed")));
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_expected_path() {
        let mount = tempfile::tempdir().unwrap();
        mount_file(mount.path(), "stem", "a.mkv");

        let found = resolver(mount.path(), 1)
            .resolve(&info("renamed", "original"), &mount.path().join("stem"))
            .await;
        assert_eq!(found, Some(mount.path().join("stem")));
    }

    #[tokio::test]
    async fn test_resolve_gives_up() {
        let mount = tempfile::tempdir().unwrap();
        let found = resolver(mount.path(), 3)
            .resolve(&info("missing", "missing"), &mount.path().join("also-missing"))
            .await;
        assert_eq!(found, None);
    }
}
