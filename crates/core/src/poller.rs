//! Status polling state machine for a remote job.
//!
//! The machine only decides; the caller performs the action and sleeps
//! between ticks. Transitions:
//!
//! ```text
//! waiting_files_selection -> SelectFiles
//! magnet_conversion | queued | downloading | compressing | uploading -> Progress
//!     (AbortUncached instead when the hash cannot be verified and caching is required)
//! downloaded -> Resolve                        (terminal)
//! magnet_error | error | dead | virus -> Fail  (terminal)
//! anything else -> Idle
//! ```
//!
//! After every non-terminal tick the caller checks [`PollMachine::budget`].

use crate::debrid::TorrentStatus;

/// What to do with the status reported by one poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollAction {
    /// The job waits for a file selection.
    SelectFiles,
    /// Still working remotely; progress percentage.
    Progress(f64),
    /// Unverifiable content while caching is required: delete the job and fail.
    AbortUncached,
    /// The service gave up on the job.
    Fail,
    /// Content is ready: resolve the mount folder and publish.
    Resolve,
    /// Unknown status; keep polling.
    Idle,
}

impl PollAction {
    /// Whether polling stops after this action.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PollAction::AbortUncached | PollAction::Fail | PollAction::Resolve
        )
    }
}

/// Poll-budget milestone reached after a non-terminal tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetEvent {
    /// Taking suspiciously long; warn but keep going.
    Slow,
    /// Give up and fail the item.
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct PollMachine {
    polls: u32,
    fail_if_not_cached: bool,
    incompatible_hash: bool,
    warn_after_polls: u32,
    timeout_polls: u32,
}

impl PollMachine {
    pub fn new(
        fail_if_not_cached: bool,
        incompatible_hash: bool,
        warn_after_polls: u32,
        timeout_polls: u32,
    ) -> Self {
        Self {
            polls: 0,
            fail_if_not_cached,
            incompatible_hash,
            warn_after_polls,
            timeout_polls,
        }
    }

    /// Polls observed so far.
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Record one poll and decide what to do with its status.
    pub fn on_status(&mut self, status: TorrentStatus, progress: f64) -> PollAction {
        self.polls += 1;

        if status == TorrentStatus::WaitingFilesSelection {
            PollAction::SelectFiles
        } else if status.is_in_progress() {
            if self.incompatible_hash && self.fail_if_not_cached {
                PollAction::AbortUncached
            } else {
                PollAction::Progress(progress)
            }
        } else if status == TorrentStatus::Downloaded {
            PollAction::Resolve
        } else if status.is_failure() {
            PollAction::Fail
        } else {
            PollAction::Idle
        }
    }

    /// Budget milestone for the current poll count.
    ///
    /// Budgets only apply when caching is required; otherwise polling never
    /// times out.
    pub fn budget(&self) -> Option<BudgetEvent> {
        if !self.fail_if_not_cached {
            return None;
        }
        if self.polls == self.warn_after_polls {
            Some(BudgetEvent::Slow)
        } else if self.polls == self.timeout_polls {
            Some(BudgetEvent::TimedOut)
        } else {
            None
        }
    }
}
