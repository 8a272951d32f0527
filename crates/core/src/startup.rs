//! Checks run before any descriptor is touched.

use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::debrid::RealDebridClient;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Startup checks failed: {}", .0.join("; "))]
    ChecksFailed(Vec<String>),
}

/// The mount must exist and already expose at least one torrent folder.
pub async fn validate_mount_path(path: &Path) -> Result<(), String> {
    let unreadable =
        |e: std::io::Error| format!("Mount path {} is not readable: {}", path.display(), e);
    let mut entries = tokio::fs::read_dir(path).await.map_err(unreadable)?;

    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
            return Ok(());
        }
    }

    Err(format!(
        "Mount path {} has no torrent folders; is the mount up?",
        path.display()
    ))
}

/// Verify the debrid host, the API key and the mount, reporting every failure.
pub async fn run_startup_checks(
    debrid: &RealDebridClient,
    mount_path: &Path,
) -> Result<(), StartupError> {
    let mut problems = Vec::new();

    if let Err(e) = debrid.validate_host().await {
        problems.push(format!("Debrid host is not reachable: {}", e));
    }
    if let Err(e) = debrid.validate_api_key().await {
        problems.push(format!("Debrid API key rejected: {}", e));
    }
    if let Err(e) = validate_mount_path(mount_path).await {
        problems.push(e);
    }

    if problems.is_empty() {
        info!("Startup checks passed");
        Ok(())
    } else {
        Err(StartupError::ChecksFailed(problems))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DebridConfig;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> RealDebridClient {
        RealDebridClient::new(DebridConfig {
            host: server.url("/rest/1.0/"),
            api_key: "secret".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_mount_path_needs_child_dir() {
        let mount = tempfile::tempdir().unwrap();
        assert!(validate_mount_path(mount.path()).await.is_err());

        std::fs::write(mount.path().join("file"), b"x").unwrap();
        assert!(validate_mount_path(mount.path()).await.is_err());

        std::fs::create_dir(mount.path().join("Movie")).unwrap();
        assert!(validate_mount_path(mount.path()).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_mount_path() {
        let err = validate_mount_path(Path::new("/no/such/mount"))
            .await
            .unwrap_err();
        assert!(err.contains("not readable"));
    }

    #[tokio::test]
    async fn test_all_checks_pass() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/rest/1.0/time");
            then.status(200).body("2024-01-01 00:00:00");
        });
        server.mock(|when, then| {
            when.method(GET).path("/rest/1.0/user");
            then.status(200).body("{}");
        });
        let mount = tempfile::tempdir().unwrap();
        std::fs::create_dir(mount.path().join("Movie")).unwrap();

        run_startup_checks(&client_for(&server), mount.path())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failures_are_collected() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/rest/1.0/time");
            then.status(200);
        });
        server.mock(|when, then| {
            when.method(GET).path("/rest/1.0/user");
            then.status(403);
        });
        let mount = tempfile::tempdir().unwrap();

        let err = run_startup_checks(&client_for(&server), mount.path())
            .await
            .unwrap_err();
        let StartupError::ChecksFailed(problems) = err;
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("account locked"));
    }
}
