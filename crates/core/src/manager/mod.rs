//! Media manager abstraction.
//!
//! Radarr and Sonarr drop descriptor files into the watch folders and later
//! import what gets published. This module provides the `MediaManager` trait
//! used to nudge them after publishing and to fail history items when an
//! item cannot be served, plus the HTTP client for their v3 API.

mod arr;
mod types;

pub use arr::ArrClient;
pub use types::*;
