use super::{types::Config, ConfigError};

/// Validate configuration.
///
/// Checks the values serde cannot: empty secrets and paths, zero timeouts,
/// and a webhook for enabled Discord alerts. Reachability of the remote
/// services is checked separately at startup.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut problems = Vec::new();

    if config.debrid.host.trim().is_empty() {
        problems.push("debrid.host cannot be empty");
    }
    if config.debrid.api_key.trim().is_empty() {
        problems.push("debrid.api_key cannot be empty");
    }
    if config.debrid.timeout_secs == 0 {
        problems.push("debrid.timeout_secs cannot be 0");
    }
    if config.blackhole.base_watch_path.as_os_str().is_empty() {
        problems.push("blackhole.base_watch_path cannot be empty");
    }
    if config.blackhole.mount_torrents_path.as_os_str().is_empty() {
        problems.push("blackhole.mount_torrents_path cannot be empty");
    }
    if config.blackhole.poll_interval_ms == 0 {
        problems.push("blackhole.poll_interval_ms cannot be 0");
    }
    if config.blackhole.wait_for_torrent_timeout == 0 {
        problems.push("blackhole.wait_for_torrent_timeout cannot be 0");
    }
    if config.radarr.api_key.trim().is_empty() {
        problems.push("radarr.api_key cannot be empty");
    }
    if config.sonarr.api_key.trim().is_empty() {
        problems.push("sonarr.api_key cannot be empty");
    }
    if let Some(discord) = &config.discord {
        if discord.enabled && discord.webhook_url.trim().is_empty() {
            problems.push("discord.webhook_url is required when discord is enabled");
        }
    }
    if config.server.enabled && config.server.port == 0 {
        problems.push("server.port cannot be 0");
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(problems.join("; ")))
    }
}
