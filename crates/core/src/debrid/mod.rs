//! Debrid service abstraction.
//!
//! This module provides a `DebridClient` trait for submitting torrents to a
//! remote caching service and tracking the resulting jobs, plus the
//! Real-Debrid HTTP backend.

mod realdebrid;
mod types;

pub use realdebrid::RealDebridClient;
pub use types::*;
