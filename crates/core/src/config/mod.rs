//! Configuration: TOML file with `BLACKHOLE_` environment overrides.
//!
//! Secrets never leave this module unredacted; anything that logs or serves
//! configuration goes through [`SanitizedConfig`].

mod loader;
mod types;
mod validate;

pub use loader::{load_config, load_config_from_str};
pub use types::*;
pub use validate::validate_config;

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Every problem found, joined with `; `.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
