pub mod alert;
pub mod config;
pub mod debrid;
pub mod descriptor;
pub mod linker;
pub mod manager;
pub mod metrics;
pub mod mount;
pub mod poller;
pub mod probe;
pub mod processor;
pub mod selection;
pub mod startup;
pub mod submission;
pub mod testing;
pub mod watcher;

pub use alert::{AlertSink, DiscordNotifier, LogAlertSink};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use debrid::{DebridClient, DebridError, RealDebridClient, TorrentStatus};
pub use descriptor::{Descriptor, DescriptorKind};
pub use manager::{ArrClient, ManagerError, ManagerKind, MediaManager};
pub use processor::{ItemOutcome, ItemProcessor, ProcessError};
pub use startup::{run_startup_checks, StartupError};
pub use watcher::{WatchError, WatchLoop, WatchSummary};
