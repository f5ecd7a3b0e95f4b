//! Job lifecycle states and which transitions between them are legal.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::JobId;

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting to be dispatched (initial state, and again after a retry).
    Pending,
    /// A worker is running the transfer.
    Syncing,
    /// The last attempt failed transiently; waiting to be recycled.
    Broken,
    /// Terminal: permanent error or retry budget exhausted.
    Failed,
    /// Terminal: the transfer exited 0.
    Completed,
}

impl JobStatus {
    /// All states, in display order.
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Pending,
        JobStatus::Syncing,
        JobStatus::Broken,
        JobStatus::Failed,
        JobStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Syncing => "syncing",
            JobStatus::Broken => "broken",
            JobStatus::Failed => "failed",
            JobStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Failed | JobStatus::Completed)
    }

    /// Whether `self -> next` is an allowed lifecycle step.
    ///
    /// `Broken -> Pending` is the only backward move; terminal states have no exits.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Syncing)
                | (Syncing, Completed)
                | (Syncing, Failed)
                | (Syncing, Broken)
                | (Broken, Pending)
                | (Broken, Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected state change. The job is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("job {job}: illegal transition {from} -> {to}")]
    Illegal {
        job: JobId,
        from: JobStatus,
        to: JobStatus,
    },
    #[error("job {job}: claimed by worker {worker} but assigned to {assigned:?}")]
    NotAssigned {
        job: JobId,
        worker: usize,
        assigned: Option<usize>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Syncing.is_terminal());
        assert!(!JobStatus::Broken.is_terminal());
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for from in [JobStatus::Failed, JobStatus::Completed] {
            for to in JobStatus::ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to} must be illegal");
            }
        }
    }

    #[test]
    fn only_broken_moves_backward() {
        assert!(JobStatus::Broken.can_transition_to(JobStatus::Pending));
        assert!(!JobStatus::Syncing.can_transition_to(JobStatus::Pending));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Broken.can_transition_to(JobStatus::Completed));
    }

    #[test]
    fn serializes_lowercase() {
        let s = serde_json::to_string(&JobStatus::Completed).unwrap();
        assert_eq!(s, "\"completed\"");
        assert_eq!(JobStatus::Broken.to_string(), "broken");
    }
}
