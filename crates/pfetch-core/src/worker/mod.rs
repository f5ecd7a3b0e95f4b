//! Worker pool: fixed set of execution units, each running one transfer at a time.
//!
//! [`Worker`] is the shared, displayable state of a pool member; the
//! execution loop itself lives in `run` and only talks to the rest of the
//! run through the shared run state and its dispatch channel.

mod run;

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;

pub use crate::job::WorkerId;

pub(crate) use run::{run_worker, WorkerContext};

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Idle,
    Working,
    /// Shut down; never reused.
    Dismissed,
}

impl WorkerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkerStatus::Idle => "idle",
            WorkerStatus::Working => "working",
            WorkerStatus::Dismissed => "dismissed",
        }
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared state of one pool member.
#[derive(Debug, Clone)]
pub struct Worker {
    pub id: WorkerId,
    status: WorkerStatus,
    recent_output: VecDeque<String>,
    capacity: usize,
}

impl Worker {
    /// New idle worker keeping the last `capacity` output lines.
    pub fn new(id: WorkerId, capacity: usize) -> Self {
        Self {
            id,
            status: WorkerStatus::Idle,
            recent_output: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn status(&self) -> WorkerStatus {
        self.status
    }

    /// Toggle between idle and working. A dismissed worker stays dismissed.
    pub fn set_working(&mut self, working: bool) {
        if self.status == WorkerStatus::Dismissed {
            return;
        }
        self.status = if working {
            WorkerStatus::Working
        } else {
            WorkerStatus::Idle
        };
    }

    pub fn dismiss(&mut self) {
        self.status = WorkerStatus::Dismissed;
    }

    pub fn push_output(&mut self, line: &str) {
        if self.capacity == 0 {
            return;
        }
        while self.recent_output.len() >= self.capacity {
            self.recent_output.pop_front();
        }
        self.recent_output.push_back(line.to_string());
    }

    /// Last output lines, oldest first.
    pub fn recent_output(&self) -> impl Iterator<Item = &str> {
        self.recent_output.iter().map(String::as_str)
    }
}
