use clap::{Parser, Subcommand};
use std::path::PathBuf;

use blackhole_core::ManagerKind;

/// Debrid blackhole for Radarr and Sonarr drop folders.
#[derive(Debug, Parser)]
#[command(name = "blackhole", version, about)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(
        long,
        short,
        global = true,
        env = "BLACKHOLE_CONFIG",
        default_value = "config.toml"
    )]
    pub config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "BLACKHOLE_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process the drop folder until it is empty, then exit
    Run {
        /// Which manager's drop folder to process (radarr or sonarr)
        manager: ManagerKind,
    },
    /// Keep rescanning the drop folder until interrupted
    Watch {
        /// Which manager's drop folder to watch (radarr or sonarr)
        manager: ManagerKind,
        /// Seconds between rescans (defaults to the configured poll interval)
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    /// Load the configuration and run the startup checks
    Validate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["blackhole", "run", "radarr"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("config.toml"));
        assert!(matches!(
            cli.command,
            Command::Run {
                manager: ManagerKind::Radarr
            }
        ));
    }

    #[test]
    fn test_parse_watch_with_interval() {
        let cli = Cli::try_parse_from([
            "blackhole",
            "--config",
            "/etc/blackhole.toml",
            "watch",
            "Sonarr",
            "--interval-secs",
            "30",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/blackhole.toml"));
        match cli.command {
            Command::Watch {
                manager,
                interval_secs,
            } => {
                assert_eq!(manager, ManagerKind::Sonarr);
                assert_eq!(interval_secs, Some(30));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_manager_rejected() {
        assert!(Cli::try_parse_from(["blackhole", "run", "lidarr"]).is_err());
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["blackhole"]).is_err());
    }
}
