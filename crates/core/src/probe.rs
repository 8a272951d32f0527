//! Readability probe for mounted files.
//!
//! Network mounts can hang on first read. The probe reads one byte on the
//! blocking pool and stops waiting after a timeout; a straggling read is left
//! to finish on its own.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Result of probing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    Readable,
    TimedOut,
    Failed(String),
}

impl ProbeResult {
    pub fn is_readable(&self) -> bool {
        matches!(self, ProbeResult::Readable)
    }
}

/// Try to read the first byte of `path` within `timeout`.
pub async fn probe_readable(path: &Path, timeout: Duration) -> ProbeResult {
    let path: PathBuf = path.to_path_buf();
    let read = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut file = std::fs::File::open(&path)?;
        let mut byte = [0u8; 1];
        let _ = file.read(&mut byte)?;
        Ok(())
    });

    match tokio::time::timeout(timeout, read).await {
        Ok(Ok(Ok(()))) => ProbeResult::Readable,
        Ok(Ok(Err(e))) => ProbeResult::Failed(e.to_string()),
        Ok(Err(e)) => ProbeResult::Failed(e.to_string()),
        Err(_) => ProbeResult::TimedOut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_readable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mkv");
        std::fs::write(&path, b"x").unwrap();

        let result = probe_readable(&path, Duration::from_secs(5)).await;
        assert!(result.is_readable());
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let result = probe_readable(Path::new("/no/such/file.mkv"), Duration::from_secs(5)).await;
        assert!(matches!(result, ProbeResult::Failed(_)));
    }
}
