use blackhole_core::{Config, ManagerKind, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    manager: ManagerKind,
}

impl AppState {
    pub fn new(config: Config, manager: ManagerKind) -> Self {
        Self { config, manager }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn manager(&self) -> ManagerKind {
        self.manager
    }
}
