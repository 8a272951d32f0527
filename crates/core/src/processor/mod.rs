//! The unit of work for one claimed descriptor.
//!
//! Submit, negotiate cache availability, select files, poll the remote job,
//! resolve the mount folder and publish links. Everything inside a unit runs
//! sequentially; units only share `Arc` handles to the clients.

mod types;
mod unit;

pub use types::{FailReason, ItemOutcome, ProcessError};
pub use unit::{only_largest_file, ItemProcessor};
