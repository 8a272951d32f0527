//! Drop-folder watch loop.
//!
//! Scans the drop folder, claims descriptors by moving them into
//! `processing/`, and runs one unit of work per claimed file. A failing or
//! panicking unit is logged and alerted without touching its siblings.

mod runner;
mod types;

pub use runner::WatchLoop;
pub use types::{WatchError, WatchSummary};
