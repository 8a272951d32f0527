//! Real-Debrid debrid client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::DebridConfig;
use crate::metrics::DEBRID_API_ERRORS;

use super::{
    AddTorrentResponse, AvailableHost, DebridClient, DebridError, FileGroup, FileSelection,
    TorrentInfo,
};

/// Real-Debrid REST client. Every request carries the `auth_token` query parameter.
pub struct RealDebridClient {
    client: Client,
    config: DebridConfig,
}

impl RealDebridClient {
    /// Create a new Real-Debrid client.
    pub fn new(config: DebridConfig) -> Result<Self, DebridError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| DebridError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.host.trim_end_matches('/')
    }

    /// Build an authenticated request for an endpoint relative to the base URL.
    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url(), endpoint);
        self.client
            .request(method, &url)
            .query(&[("auth_token", self.config.api_key.as_str())])
    }

    /// Send a request, counting failures per endpoint.
    async fn send(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, DebridError> {
        debug!(endpoint = endpoint, "Debrid request");
        let result = match request.send().await {
            Ok(response) => check_status(response).await,
            Err(e) => Err(map_request_error(e)),
        };
        if result.is_err() {
            DEBRID_API_ERRORS.with_label_values(&[endpoint]).inc();
        }
        result
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<T, DebridError> {
        let response = self.send(endpoint, request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| DebridError::ApiError(format!("Failed to parse response: {}", e)))
    }

    /// Check that the service answers `GET time` with 200.
    pub async fn validate_host(&self) -> Result<(), DebridError> {
        let url = format!("{}/time", self.base_url());
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_request_error)?;

        if response.status() == StatusCode::OK {
            Ok(())
        } else {
            Err(DebridError::ApiError(format!("HTTP {}", response.status())))
        }
    }

    /// Check the API key against `GET user`.
    pub async fn validate_api_key(&self) -> Result<(), DebridError> {
        let response = self
            .request(Method::GET, "user")
            .send()
            .await
            .map_err(map_request_error)?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(DebridError::AuthenticationFailed(
                "Invalid or expired API key.".to_string(),
            )),
            StatusCode::FORBIDDEN => Err(DebridError::AuthenticationFailed(
                "Permission denied, account locked.".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

fn map_request_error(e: reqwest::Error) -> DebridError {
    if e.is_timeout() {
        DebridError::Timeout
    } else if e.is_connect() {
        DebridError::ConnectionFailed(e.to_string())
    } else {
        DebridError::ApiError(e.to_string())
    }
}

async fn check_status(response: Response) -> Result<Response, DebridError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(200).collect();
    Err(match status {
        StatusCode::UNAUTHORIZED => {
            DebridError::AuthenticationFailed("Invalid or expired API key".to_string())
        }
        StatusCode::FORBIDDEN => DebridError::AuthenticationFailed(format!(
            "Permission denied: {}",
            body
        )),
        StatusCode::NOT_FOUND => DebridError::TorrentNotFound(body),
        _ => DebridError::ApiError(format!("HTTP {}: {}", status, body)),
    })
}

/// Extract the file groups of the first hoster from an instant availability payload.
///
/// The payload looks like `{"<hash>": {"rd": [{"1": {...}, "2": {...}}]}}`; a hash
/// with nothing cached maps to an empty array or object instead.
fn parse_instant_availability(body: &Value) -> Option<Vec<FileGroup>> {
    let hosters = body.as_object()?.values().next()?.as_object()?;
    let groups = hosters.values().next()?.as_array()?;

    let groups: Vec<FileGroup> = groups
        .iter()
        .filter_map(Value::as_object)
        .map(|group| group.keys().cloned().collect())
        .filter(|group: &FileGroup| !group.is_empty())
        .collect();

    if groups.is_empty() {
        None
    } else {
        Some(groups)
    }
}

#[async_trait]
impl DebridClient for RealDebridClient {
    fn name(&self) -> &str {
        "realdebrid"
    }

    async fn instant_availability(
        &self,
        hash: &str,
    ) -> Result<Option<Vec<FileGroup>>, DebridError> {
        let endpoint = format!("torrents/instantAvailability/{}", urlencoding::encode(hash));
        let body: Value = self
            .send_json("instant_availability", self.request(Method::GET, &endpoint))
            .await?;
        Ok(parse_instant_availability(&body))
    }

    async fn available_hosts(&self) -> Result<Vec<AvailableHost>, DebridError> {
        self.send_json(
            "available_hosts",
            self.request(Method::GET, "torrents/availableHosts"),
        )
        .await
    }

    async fn add_torrent(
        &self,
        host: &str,
        data: Vec<u8>,
    ) -> Result<AddTorrentResponse, DebridError> {
        let request = self
            .request(Method::PUT, "torrents/addTorrent")
            .query(&[("host", host)])
            .body(data);
        self.send_json("add_torrent", request).await
    }

    async fn add_magnet(
        &self,
        host: &str,
        magnet: &str,
    ) -> Result<AddTorrentResponse, DebridError> {
        let request = self
            .request(Method::POST, "torrents/addMagnet")
            .query(&[("host", host)])
            .form(&[("magnet", magnet)]);
        self.send_json("add_magnet", request).await
    }

    async fn torrent_info(&self, id: &str) -> Result<TorrentInfo, DebridError> {
        let endpoint = format!("torrents/info/{}", urlencoding::encode(id));
        self.send_json("torrent_info", self.request(Method::GET, &endpoint))
            .await
    }

    async fn select_files(&self, id: &str, files: &FileSelection) -> Result<(), DebridError> {
        let endpoint = format!("torrents/selectFiles/{}", urlencoding::encode(id));
        let value = files.to_form_value();
        let request = self
            .request(Method::POST, &endpoint)
            .form(&[("files", value.as_str())]);
        self.send("select_files", request).await?;
        Ok(())
    }

    async fn delete_torrent(&self, id: &str) -> Result<(), DebridError> {
        let endpoint = format!("torrents/delete/{}", urlencoding::encode(id));
        self.send("delete_torrent", self.request(Method::DELETE, &endpoint))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> RealDebridClient {
        RealDebridClient::new(DebridConfig {
            host: server.url("/rest/1.0/"),
            api_key: "secret".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_parse_instant_availability_first_hoster() {
        let body = json!({
            "abc": {
                "rd": [
                    {"1": {"filename": "a.mkv", "filesize": 10}},
                    {"1": {"filename": "a.mkv", "filesize": 10}, "2": {"filename": "b.srt", "filesize": 1}}
                ]
            }
        });
        let groups = parse_instant_availability(&body).unwrap();
        assert_eq!(groups.len(), 2);
        assert!(groups[0].contains("1"));
        assert_eq!(groups[1].len(), 2);
    }

    #[test]
    fn test_parse_instant_availability_not_cached() {
        assert!(parse_instant_availability(&json!({"abc": []})).is_none());
        assert!(parse_instant_availability(&json!({"abc": {}})).is_none());
        assert!(parse_instant_availability(&json!({"abc": {"rd": []}})).is_none());
        assert!(parse_instant_availability(&json!({})).is_none());
    }

    #[tokio::test]
    async fn test_available_hosts_sends_auth_token() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/1.0/torrents/availableHosts")
                .query_param("auth_token", "secret");
            then.status(200)
                .json_body(json!([{"host": "real-debrid.com", "max_file_size": 2000}]));
        });

        let hosts = client_for(&server).available_hosts().await.unwrap();
        mock.assert_async().await;
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].host, "real-debrid.com");
    }

    #[tokio::test]
    async fn test_add_magnet_binds_host() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/1.0/torrents/addMagnet")
                .query_param("host", "real-debrid.com")
                .query_param("auth_token", "secret");
            then.status(201)
                .json_body(json!({"id": "JOB1", "uri": "https://rd/torrents/info/JOB1"}));
        });

        let added = client_for(&server)
            .add_magnet("real-debrid.com", "magnet:?xt=urn:btih:abc")
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(added.id, "JOB1");
    }

    #[tokio::test]
    async fn test_add_torrent_uses_put() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(PUT).path("/rest/1.0/torrents/addTorrent");
            then.status(201).json_body(json!({"id": "JOB2"}));
        });

        let added = client_for(&server)
            .add_torrent("real-debrid.com", b"d4:infod4:name1:aee".to_vec())
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(added.id, "JOB2");
    }

    #[tokio::test]
    async fn test_torrent_info_not_found() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/rest/1.0/torrents/info/MISSING");
            then.status(404).body("{\"error\": \"unknown_ressource\"}");
        });

        let err = client_for(&server).torrent_info("MISSING").await.unwrap_err();
        assert!(matches!(err, DebridError::TorrentNotFound(_)));
    }

    #[tokio::test]
    async fn test_select_and_delete() {
        let server = MockServer::start_async().await;
        let select = server.mock(|when, then| {
            when.method(POST).path("/rest/1.0/torrents/selectFiles/JOB1");
            then.status(204);
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/rest/1.0/torrents/delete/JOB1");
            then.status(204);
        });

        let client = client_for(&server);
        client
            .select_files("JOB1", &FileSelection(vec!["1".to_string()]))
            .await
            .unwrap();
        client.delete_torrent("JOB1").await.unwrap();
        select.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_instant_availability_request() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET)
                .path("/rest/1.0/torrents/instantAvailability/0123abcd");
            then.status(200)
                .json_body(json!({"0123abcd": {"rd": [{"4": {"filename": "x.mkv", "filesize": 5}}]}}));
        });

        let groups = client_for(&server)
            .instant_availability("0123abcd")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(groups, vec![FileGroup::from(["4".to_string()])]);
    }

    #[tokio::test]
    async fn test_validate_api_key_reports_locked_account() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/rest/1.0/user");
            then.status(403);
        });

        let err = client_for(&server).validate_api_key().await.unwrap_err();
        assert!(err.to_string().contains("account locked"));
    }

    #[tokio::test]
    async fn test_validate_host_ok() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/rest/1.0/time");
            then.status(200).body("2024-01-01 00:00:00");
        });

        assert!(client_for(&server).validate_host().await.is_ok());
    }
}
