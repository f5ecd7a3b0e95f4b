//! Dispatcher: hands pending, unassigned jobs to idle workers.
//!
//! Assignment is two-phase. Under the run lock the dispatcher records
//! `job.assigned_worker`; the job id then travels over that worker's own
//! channel (capacity 1) and the worker claims execution when it receives it.
//! A worker is only offered a job while it is idle and holds nothing else,
//! so no worker runs two jobs and no job reaches two workers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::job::{JobId, JobStatus, WorkerId};
use crate::run::{Registry, RunState};
use crate::worker::WorkerStatus;

/// One assignment round over the tables. Scans jobs round-robin from
/// `cursor` and gives each pending, unassigned job to the first available
/// worker. Returns the new `(job, worker)` pairs.
pub(crate) fn assign_pending(reg: &mut Registry, cursor: &mut usize) -> Vec<(JobId, WorkerId)> {
    let n = reg.jobs.len();
    if n == 0 {
        return Vec::new();
    }
    let mut available: Vec<bool> = reg
        .workers
        .iter()
        .map(|w| w.status() == WorkerStatus::Idle)
        .collect();
    for (w, free) in available.iter_mut().enumerate() {
        if *free && reg.held_by(w).next().is_some() {
            *free = false;
        }
    }

    let mut assigned = Vec::new();
    for step in 0..n {
        let Some(worker) = available.iter().position(|free| *free) else {
            break;
        };
        let idx = (*cursor + step) % n;
        let job = &mut reg.jobs[idx];
        if job.status() != JobStatus::Pending || job.assigned_worker.is_some() {
            continue;
        }
        job.assigned_worker = Some(worker);
        available[worker] = false;
        assigned.push((idx, worker));
    }
    if let Some(&(idx, _)) = assigned.last() {
        *cursor = (idx + 1) % n;
    }
    assigned
}

pub(crate) struct Dispatcher {
    state: Arc<RunState>,
    senders: Vec<mpsc::Sender<JobId>>,
    cursor: usize,
    rescan: Duration,
}

impl Dispatcher {
    /// `senders[i]` must feed worker `i`.
    pub(crate) fn new(
        state: Arc<RunState>,
        senders: Vec<mpsc::Sender<JobId>>,
        rescan: Duration,
    ) -> Self {
        Self {
            state,
            senders,
            cursor: 0,
            rescan,
        }
    }

    /// Dispatch until shutdown is signalled. Dropping `self` on return closes
    /// every worker channel, which is how workers learn the run is over.
    pub(crate) async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            self.dispatch_round();
            tokio::select! {
                _ = self.state.dispatcher_wakeup() => {}
                _ = tokio::time::sleep(self.rescan) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("dispatcher stopped");
    }

    fn dispatch_round(&mut self) {
        let assigned = assign_pending(&mut self.state.lock(), &mut self.cursor);
        for (job, worker) in assigned {
            let sent = self
                .senders
                .get(worker)
                .map(|tx| tx.try_send(job).is_ok())
                .unwrap_or(false);
            if sent {
                tracing::debug!(job, worker, "job dispatched");
                continue;
            }
            tracing::warn!(job, worker, "worker channel unavailable; job returned to the pool");
            let mut reg = self.state.lock();
            if let Some(j) = reg.jobs.get_mut(job) {
                if j.status() == JobStatus::Pending && j.assigned_worker == Some(worker) {
                    j.assigned_worker = None;
                }
            }
        }
    }
}
