//! A debrid job owned by one unit of work.

use std::sync::Arc;

use tracing::debug;

use crate::debrid::{DebridClient, FileGroup, FileSelection, TorrentInfo};

use super::{SubmissionError, SubmissionStrategy, INFO_HASH_LEN};

/// Instant-availability answer for a job's hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// The hash cannot be looked up; treated as available.
    Unverifiable,
    /// File-id groups the service can serve immediately.
    Cached(Vec<FileGroup>),
    NotCached,
}

impl Availability {
    pub fn is_available(&self) -> bool {
        !matches!(self, Availability::NotCached)
    }

    /// Cached groups, empty unless `Cached`.
    pub fn groups(&self) -> &[FileGroup] {
        match self {
            Availability::Cached(groups) => groups,
            _ => &[],
        }
    }
}

/// Remote job state, with memoized hash and availability.
pub struct RemoteJob {
    client: Arc<dyn DebridClient>,
    strategy: SubmissionStrategy,
    id: Option<String>,
    hash: Option<String>,
    availability: Option<Availability>,
    /// Only accept content the service already has.
    pub fail_if_not_cached: bool,
    /// Materialize the largest media file only.
    pub only_largest_file: bool,
}

impl RemoteJob {
    pub fn new(
        client: Arc<dyn DebridClient>,
        strategy: SubmissionStrategy,
        fail_if_not_cached: bool,
        only_largest_file: bool,
    ) -> Self {
        Self {
            client,
            strategy,
            id: None,
            hash: None,
            availability: None,
            fail_if_not_cached,
            only_largest_file,
        }
    }

    /// Remote job id, once submitted.
    pub fn id(&self) -> Result<&str, SubmissionError> {
        self.id.as_deref().ok_or(SubmissionError::MissingId)
    }

    /// Content hash, computed on first use.
    pub fn hash(&mut self) -> Result<String, SubmissionError> {
        if let Some(hash) = &self.hash {
            return Ok(hash.clone());
        }
        let hash = self.strategy.compute_hash()?;
        self.hash = Some(hash.clone());
        Ok(hash)
    }

    /// Hashes that are not 40 characters cannot be checked for availability.
    pub fn incompatible_hash(&mut self) -> Result<bool, SubmissionError> {
        Ok(self.hash()?.len() != INFO_HASH_LEN)
    }

    /// Instant availability, queried once unless `refresh` is set.
    pub async fn check_availability(
        &mut self,
        refresh: bool,
    ) -> Result<Availability, SubmissionError> {
        if !refresh {
            if let Some(availability) = &self.availability {
                return Ok(availability.clone());
            }
        }

        let availability = if self.incompatible_hash()? {
            Availability::Unverifiable
        } else {
            let hash = self.hash()?;
            match self.client.instant_availability(&hash).await? {
                Some(groups) if !groups.is_empty() => Availability::Cached(groups),
                _ => Availability::NotCached,
            }
        };

        self.availability = Some(availability.clone());
        Ok(availability)
    }

    /// Create the remote job.
    ///
    /// Returns `false` without creating anything when caching is required and
    /// the content is not cached. A job is submitted at most once.
    pub async fn submit(&mut self) -> Result<bool, SubmissionError> {
        if let Some(id) = &self.id {
            return Err(SubmissionError::AlreadySubmitted(id.clone()));
        }
        if self.fail_if_not_cached
            && !self.incompatible_hash()?
            && !self.check_availability(false).await?.is_available()
        {
            return Ok(false);
        }

        let host = self.available_host().await?;
        let id = self.strategy.submit(self.client.as_ref(), &host).await?;
        debug!(id = %id, host = %host, "Created remote job");
        self.id = Some(id);
        Ok(true)
    }

    /// First host the service offers.
    async fn available_host(&self) -> Result<String, SubmissionError> {
        self.client
            .available_hosts()
            .await?
            .into_iter()
            .next()
            .map(|h| h.host)
            .ok_or(SubmissionError::NoAvailableHost)
    }

    /// Fresh job details; never cached.
    pub async fn info(&self) -> Result<TorrentInfo, SubmissionError> {
        let id = self.id()?;
        Ok(self.client.torrent_info(id).await?)
    }

    pub async fn select_files(&self, ids: Vec<String>) -> Result<(), SubmissionError> {
        let id = self.id()?;
        self.client
            .select_files(id, &FileSelection(ids))
            .await?;
        Ok(())
    }

    pub async fn delete(&self) -> Result<(), SubmissionError> {
        let id = self.id()?;
        self.client.delete_torrent(id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDebridClient;

    const HASH: &str = "0123456789abcdef0123456789abcdef01234567";

    fn magnet(hash: &str) -> SubmissionStrategy {
        SubmissionStrategy::Magnet(format!("magnet:?xt=urn:btih:{}", hash))
    }

    fn group(ids: &[&str]) -> FileGroup {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_operations_without_id_fail() {
        let client = Arc::new(MockDebridClient::new());
        let job = RemoteJob::new(client, magnet(HASH), true, true);

        assert!(matches!(job.id(), Err(SubmissionError::MissingId)));
        assert!(matches!(job.info().await, Err(SubmissionError::MissingId)));
        assert!(matches!(job.delete().await, Err(SubmissionError::MissingId)));
        assert!(matches!(
            job.select_files(vec!["1".into()]).await,
            Err(SubmissionError::MissingId)
        ));
    }

    #[tokio::test]
    async fn test_availability_is_memoized_unless_refreshed() {
        let client = Arc::new(MockDebridClient::new());
        client.set_availability(HASH, vec![group(&["1"])]).await;
        let mut job = RemoteJob::new(client.clone(), magnet(HASH), true, true);

        let first = job.check_availability(false).await.unwrap();
        let second = job.check_availability(false).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(client.call_count("instant_availability").await, 1);

        job.check_availability(true).await.unwrap();
        assert_eq!(client.call_count("instant_availability").await, 2);
    }

    #[tokio::test]
    async fn test_incompatible_hash_is_unverifiable() {
        let client = Arc::new(MockDebridClient::new());
        let mut job = RemoteJob::new(client.clone(), magnet("shortbase32"), true, false);

        assert!(job.incompatible_hash().unwrap());
        assert_eq!(
            job.check_availability(false).await.unwrap(),
            Availability::Unverifiable
        );
        assert_eq!(client.call_count("instant_availability").await, 0);
    }

    #[tokio::test]
    async fn test_submit_refuses_uncached_content() {
        let client = Arc::new(MockDebridClient::new());
        let mut job = RemoteJob::new(client.clone(), magnet(HASH), true, true);

        assert!(!job.submit().await.unwrap());
        assert!(job.id().is_err());
        assert_eq!(client.call_count("add_magnet").await, 0);
    }

    #[tokio::test]
    async fn test_submit_without_cache_requirement() {
        let client = Arc::new(MockDebridClient::new());
        let mut job = RemoteJob::new(client.clone(), magnet(HASH), false, true);

        assert!(job.submit().await.unwrap());
        assert!(job.id().is_ok());
        assert_eq!(client.call_count("instant_availability").await, 0);
    }

    #[tokio::test]
    async fn test_submit_cached_binds_first_host() {
        let client = Arc::new(MockDebridClient::new());
        client.set_availability(HASH, vec![group(&["1"])]).await;
        client
            .set_hosts(vec!["first.host".into(), "second.host".into()])
            .await;
        let mut job = RemoteJob::new(client.clone(), magnet(HASH), true, true);

        assert!(job.submit().await.unwrap());
        let calls = client.calls().await;
        assert!(calls.iter().any(|c| c.starts_with("add_magnet:first.host:")));
    }

    #[tokio::test]
    async fn test_submit_without_hosts_fails() {
        let client = Arc::new(MockDebridClient::new());
        client.set_hosts(Vec::new()).await;
        let mut job = RemoteJob::new(client, magnet(HASH), false, true);

        assert!(matches!(
            job.submit().await,
            Err(SubmissionError::NoAvailableHost)
        ));
    }

    #[tokio::test]
    async fn test_second_submit_is_rejected() {
        let client = Arc::new(MockDebridClient::new());
        let mut job = RemoteJob::new(client.clone(), magnet(HASH), false, true);

        assert!(job.submit().await.unwrap());
        let first_id = job.id().unwrap().to_string();

        assert!(matches!(
            job.submit().await,
            Err(SubmissionError::AlreadySubmitted(id)) if id == first_id
        ));
        assert_eq!(job.id().unwrap(), first_id);
        assert_eq!(client.call_count("add_magnet").await, 1);
    }
}
