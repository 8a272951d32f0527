use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::manager::ManagerKind;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub debrid: DebridConfig,
    pub blackhole: BlackholeConfig,
    pub radarr: ArrConfig,
    pub sonarr: ArrConfig,
    #[serde(default)]
    pub discord: Option<DiscordConfig>,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Manager client configuration for the given kind.
    pub fn arr(&self, kind: ManagerKind) -> &ArrConfig {
        match kind {
            ManagerKind::Radarr => &self.radarr,
            ManagerKind::Sonarr => &self.sonarr,
        }
    }
}

/// Debrid service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DebridConfig {
    /// REST base URL (e.g., "https://api.real-debrid.com/rest/1.0/")
    #[serde(default = "default_debrid_host")]
    pub host: String,
    /// API token, sent as the `auth_token` query parameter
    pub api_key: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_debrid_host() -> String {
    "https://api.real-debrid.com/rest/1.0/".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// Watch folder and processing behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlackholeConfig {
    /// Root of the drop folders. Relative paths resolve against the working directory.
    pub base_watch_path: PathBuf,
    /// Radarr drop folder, relative to `base_watch_path`
    #[serde(default = "default_radarr_path")]
    pub radarr_path: PathBuf,
    /// Sonarr drop folder, relative to `base_watch_path`
    #[serde(default = "default_sonarr_path")]
    pub sonarr_path: PathBuf,
    /// Where the debrid mount exposes finished torrents
    pub mount_torrents_path: PathBuf,
    /// Only accept content that is already cached remotely
    #[serde(default = "default_true")]
    pub fail_if_not_cached: bool,
    /// Poll budget for cached jobs, and attempt budget for mount resolution
    #[serde(default = "default_wait_for_torrent_timeout")]
    pub wait_for_torrent_timeout: u32,
    /// Seconds the mount usually needs to show new torrents
    #[serde(default = "default_mount_refresh_secs")]
    pub mount_refresh_secs: u32,
    /// History records fetched when failing an item
    #[serde(default = "default_history_page_size")]
    pub history_page_size: u32,
    /// Tick interval for every polling loop (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Poll count after which a slow cached job raises a warning
    #[serde(default = "default_warn_after_polls")]
    pub warn_after_polls: u32,
    /// How many times the manager is asked to refresh after publishing
    #[serde(default = "default_refresh_count")]
    pub refresh_count: u32,
    /// Probe each mounted file for readability before linking
    #[serde(default)]
    pub probe_accessibility: bool,
    /// Hard timeout for a single accessibility probe (seconds)
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl BlackholeConfig {
    /// Drop folder for the given manager.
    pub fn watch_root(&self, kind: ManagerKind) -> PathBuf {
        let base = if self.base_watch_path.is_absolute() {
            self.base_watch_path.clone()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&self.base_watch_path))
                .unwrap_or_else(|_| self.base_watch_path.clone())
        };
        match kind {
            ManagerKind::Radarr => base.join(&self.radarr_path),
            ManagerKind::Sonarr => base.join(&self.sonarr_path),
        }
    }
}

fn default_radarr_path() -> PathBuf {
    PathBuf::from("radarr")
}

fn default_sonarr_path() -> PathBuf {
    PathBuf::from("sonarr")
}

fn default_true() -> bool {
    true
}

fn default_wait_for_torrent_timeout() -> u32 {
    60
}

fn default_mount_refresh_secs() -> u32 {
    10
}

fn default_history_page_size() -> u32 {
    500
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_warn_after_polls() -> u32 {
    21
}

fn default_refresh_count() -> u32 {
    60
}

fn default_probe_timeout_secs() -> u64 {
    10
}

/// Radarr / Sonarr API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArrConfig {
    /// Base URL (e.g., "http://localhost:7878")
    pub host: String,
    /// API key sent as `X-Api-Key`
    pub api_key: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

/// Discord webhook alerting
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscordConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Also send non-error updates (successes, informational notices)
    #[serde(default)]
    pub update_enabled: bool,
    pub webhook_url: String,
}

/// Health/metrics HTTP server (watch mode only)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    9090
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub debrid: SanitizedDebridConfig,
    pub blackhole: BlackholeConfig,
    pub radarr: SanitizedArrConfig,
    pub sonarr: SanitizedArrConfig,
    pub discord_enabled: bool,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDebridConfig {
    pub host: String,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedArrConfig {
    pub host: String,
    pub api_key_configured: bool,
}

impl From<&ArrConfig> for SanitizedArrConfig {
    fn from(arr: &ArrConfig) -> Self {
        Self {
            host: arr.host.clone(),
            api_key_configured: !arr.api_key.is_empty(),
        }
    }
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            debrid: SanitizedDebridConfig {
                host: config.debrid.host.clone(),
                api_key_configured: !config.debrid.api_key.is_empty(),
                timeout_secs: config.debrid.timeout_secs,
            },
            blackhole: config.blackhole.clone(),
            radarr: SanitizedArrConfig::from(&config.radarr),
            sonarr: SanitizedArrConfig::from(&config.sonarr),
            discord_enabled: config.discord.as_ref().is_some_and(|d| d.enabled),
            server: config.server.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) const MINIMAL_TOML: &str = r#"
[debrid]
api_key = "rd-key"

[blackhole]
base_watch_path = "/watch"
mount_torrents_path = "/mnt/remote/realdebrid/torrents"

[radarr]
host = "http://localhost:7878"
api_key = "radarr-key"

[sonarr]
host = "http://localhost:8989"
api_key = "sonarr-key"
"#;
