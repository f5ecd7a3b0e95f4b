//! Shared run context: the job and worker tables behind one lock, plus the
//! signals connecting controller, dispatcher and workers.
//!
//! Every status or assignment change happens while holding `registry`, which
//! is what keeps a job from being claimed by two workers. The lock is never
//! held across an `.await`.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::futures::Notified;
use tokio::sync::{watch, Notify};

use crate::job::{Job, JobId, WorkerId};
use crate::progress::ProgressSnapshot;
use crate::worker::Worker;

/// Job and worker tables. Worker ids are indices into `workers`.
#[derive(Debug)]
pub(crate) struct Registry {
    pub(crate) jobs: Vec<Job>,
    pub(crate) workers: Vec<Worker>,
}

impl Registry {
    /// Job ids currently held by `worker` (non-terminal and assigned to it).
    pub(crate) fn held_by(&self, worker: WorkerId) -> impl Iterator<Item = JobId> + '_ {
        self.jobs
            .iter()
            .filter(move |j| j.assigned_worker == Some(worker) && !j.is_terminal())
            .map(|j| j.id)
    }
}

pub(crate) struct RunState {
    registry: Mutex<Registry>,
    started: Instant,
    total: usize,
    terminal: watch::Sender<usize>,
    wake: Notify,
}

impl RunState {
    pub(crate) fn new(jobs: Vec<Job>, workers: Vec<Worker>) -> Self {
        let total = jobs.len();
        let already_terminal = jobs.iter().filter(|j| j.is_terminal()).count();
        let (terminal, _) = watch::channel(already_terminal);
        Self {
            registry: Mutex::new(Registry { jobs, workers }),
            started: Instant::now(),
            total,
            terminal,
            wake: Notify::new(),
        }
    }

    /// Lock the tables. A panicked holder cannot leave a half-applied
    /// transition (each one is a single method call), so poisoning is ignored.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn push_output(&self, worker: WorkerId, line: &str) {
        if let Some(w) = self.lock().workers.get_mut(worker) {
            w.push_output(line);
        }
    }

    /// Record that one more job reached a terminal status.
    pub(crate) fn job_terminal(&self) {
        self.terminal.send_modify(|n| *n += 1);
    }

    /// Resolves once every job is terminal.
    pub(crate) async fn all_terminal(&self) {
        let total = self.total;
        let mut rx = self.terminal.subscribe();
        let _ = rx.wait_for(|done| *done >= total).await;
    }

    /// Ask the dispatcher for another round (a worker went idle or a job was requeued).
    pub(crate) fn wake_dispatcher(&self) {
        self.wake.notify_one();
    }

    pub(crate) fn dispatcher_wakeup(&self) -> Notified<'_> {
        self.wake.notified()
    }

    pub(crate) fn dismiss_workers(&self) {
        for w in self.lock().workers.iter_mut() {
            w.dismiss();
        }
    }

    pub(crate) fn snapshot(&self) -> ProgressSnapshot {
        let reg = self.lock();
        ProgressSnapshot::capture(&reg.jobs, &reg.workers, self.elapsed())
    }

    pub(crate) fn jobs(&self) -> Vec<Job> {
        self.lock().jobs.clone()
    }
}
