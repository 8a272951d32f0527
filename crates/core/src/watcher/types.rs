//! Types for the watch loop.

use thiserror::Error;

use crate::processor::ItemOutcome;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Drop folder error: {0}")]
    Io(#[from] std::io::Error),
}

/// Counts of what a watch run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSummary {
    pub claimed: usize,
    /// Descriptors left alone because their destination already exists.
    pub deferred: usize,
    pub published: usize,
    pub failed: usize,
    pub folder_not_found: usize,
    /// Units that ended with an error or a panic.
    pub crashed: usize,
}

impl WatchSummary {
    pub(crate) fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Published { .. } => self.published += 1,
            ItemOutcome::Failed(_) => self.failed += 1,
            ItemOutcome::FolderNotFound => self.folder_not_found += 1,
        }
    }

    /// Units that ran to completion or crashed.
    pub fn finished(&self) -> usize {
        self.published + self.failed + self.folder_not_found + self.crashed
    }
}
