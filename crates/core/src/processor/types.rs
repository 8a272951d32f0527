//! Types for the per-item unit of work.

use thiserror::Error;

use crate::linker::LinkError;
use crate::manager::ManagerError;
use crate::submission::SubmissionError;

/// Errors that end a unit of work without a regular outcome.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error("Media manager error: {0}")]
    Manager(#[from] ManagerError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("No history items found to fail for {0}")]
    NoHistoryMatch(String),

    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why an item was failed back to the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReason {
    /// Caching was required and the content is not cached.
    NotCached,
    /// No acceptable file selection exists.
    SelectionRejected,
    /// Caching was required but the hash cannot be checked.
    Unverifiable,
    /// The service reported a terminal failure.
    RemoteFailure,
    /// The poll budget ran out.
    TimedOut,
}

impl FailReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailReason::NotCached => "not_cached",
            FailReason::SelectionRejected => "selection_rejected",
            FailReason::Unverifiable => "unverifiable",
            FailReason::RemoteFailure => "remote_failure",
            FailReason::TimedOut => "timed_out",
        }
    }
}

/// How a unit of work ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Content was linked into the completed tree.
    Published { links: usize },
    /// The item was failed back to the manager.
    Failed(FailReason),
    /// The job finished but its folder never showed up on the mount.
    FolderNotFound,
}

impl ItemOutcome {
    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemOutcome::Published { .. } => "published",
            ItemOutcome::Failed(_) => "failed",
            ItemOutcome::FolderNotFound => "folder_not_found",
        }
    }
}
