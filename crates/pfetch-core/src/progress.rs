//! Progress reporting: counts per job and worker status plus each worker's
//! latest output, redrawn on a fixed interval.
//!
//! The reporter only reads the run state. Turning it off changes nothing
//! about how jobs run.

use serde::Serialize;
use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::job::{Job, JobStatus, WorkerId};
use crate::run::RunState;
use crate::worker::{Worker, WorkerStatus};

/// Cursor home + clear screen.
const CLEAR_SCREEN: &str = "\x1b[H\x1b[J";

/// Jobs per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub pending: usize,
    pub syncing: usize,
    pub broken: usize,
    pub failed: usize,
    pub completed: usize,
}

impl JobCounts {
    pub fn add(&mut self, status: JobStatus) {
        match status {
            JobStatus::Pending => self.pending += 1,
            JobStatus::Syncing => self.syncing += 1,
            JobStatus::Broken => self.broken += 1,
            JobStatus::Failed => self.failed += 1,
            JobStatus::Completed => self.completed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.syncing + self.broken + self.failed + self.completed
    }
}

/// Workers per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerCounts {
    pub idle: usize,
    pub working: usize,
    pub dismissed: usize,
}

impl WorkerCounts {
    pub fn add(&mut self, status: WorkerStatus) {
        match status {
            WorkerStatus::Idle => self.idle += 1,
            WorkerStatus::Working => self.working += 1,
            WorkerStatus::Dismissed => self.dismissed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.idle + self.working + self.dismissed
    }
}

/// One worker as shown in the display.
#[derive(Debug, Clone)]
pub struct WorkerView {
    pub id: WorkerId,
    pub status: WorkerStatus,
    pub recent_output: Vec<String>,
}

/// Point-in-time view of a run.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub elapsed: Duration,
    pub jobs: JobCounts,
    pub workers: WorkerCounts,
    pub worker_views: Vec<WorkerView>,
}

impl ProgressSnapshot {
    pub fn capture(jobs: &[Job], workers: &[Worker], elapsed: Duration) -> Self {
        let mut job_counts = JobCounts::default();
        for job in jobs {
            job_counts.add(job.status());
        }
        let mut worker_counts = WorkerCounts::default();
        let worker_views = workers
            .iter()
            .map(|w| {
                worker_counts.add(w.status());
                WorkerView {
                    id: w.id,
                    status: w.status(),
                    recent_output: w.recent_output().map(str::to_string).collect(),
                }
            })
            .collect();
        Self {
            elapsed,
            jobs: job_counts,
            workers: worker_counts,
            worker_views,
        }
    }

    pub fn render(&self) -> String {
        let mut s = String::new();
        let w = &self.workers;
        let j = &self.jobs;
        let _ = writeln!(s, "{} seconds elapsed.", self.elapsed.as_secs());
        let _ = writeln!(
            s,
            "Workers ({} in total): {} idle, {} working, {} dismissed.",
            w.total(),
            w.idle,
            w.working,
            w.dismissed
        );
        let _ = writeln!(
            s,
            "Jobs ({} in total): {} pending, {} syncing, {} broken, {} failed, {} completed.",
            j.total(),
            j.pending,
            j.syncing,
            j.broken,
            j.failed,
            j.completed
        );
        for view in &self.worker_views {
            let _ = writeln!(s, "\nWorker {} ({}) latest output:", view.id, view.status);
            for line in &view.recent_output {
                let _ = writeln!(s, "  {line}");
            }
        }
        s
    }
}

/// One frame of output. The screen is cleared first only on a terminal, so
/// redirected output is a plain sequence of frames.
pub fn frame(snapshot: &ProgressSnapshot, terminal: bool) -> String {
    let body = snapshot.render();
    if terminal {
        format!("{CLEAR_SCREEN}{body}")
    } else {
        body
    }
}

/// Draw one frame to stdout. Write errors are ignored: the display is advisory.
pub fn draw(snapshot: &ProgressSnapshot) {
    let stdout = io::stdout();
    let terminal = stdout.is_terminal();
    let mut out = stdout.lock();
    let _ = out.write_all(frame(snapshot, terminal).as_bytes());
    let _ = out.flush();
}

/// Redraw every `interval` until shutdown is signalled.
pub(crate) async fn run_reporter(
    state: Arc<RunState>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => draw(&state.snapshot()),
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobTemplate;
    use std::path::PathBuf;

    fn jobs(n: usize) -> Vec<Job> {
        let t = JobTemplate {
            program: "rsync".into(),
            transfer_opts: "-a".into(),
            remote_root: "host:/r".into(),
            local_root: PathBuf::from("/tmp/x"),
            single_file_extensions: Vec::new(),
            retry_budget: 0,
        };
        (0..n).map(|i| t.build(i, &format!("d{i}"))).collect()
    }

    #[test]
    fn counts_and_render() {
        let mut jobs = jobs(3);
        jobs[0].assigned_worker = Some(0);
        jobs[0].begin_attempt(0).unwrap();
        jobs[1].assigned_worker = Some(1);
        jobs[1].begin_attempt(1).unwrap();
        jobs[1]
            .finish_attempt(JobStatus::Completed, Some(0), String::new())
            .unwrap();

        let mut workers = vec![Worker::new(0, 2), Worker::new(1, 2)];
        workers[0].set_working(true);
        workers[0].push_output("a");
        workers[0].push_output("b");
        workers[0].push_output("c");

        let snap = ProgressSnapshot::capture(&jobs, &workers, Duration::from_millis(4500));
        assert_eq!(
            snap.jobs,
            JobCounts {
                pending: 1,
                syncing: 1,
                broken: 0,
                failed: 0,
                completed: 1
            }
        );
        assert_eq!(snap.workers.working, 1);
        assert_eq!(snap.workers.idle, 1);

        let text = snap.render();
        assert!(text.starts_with("4 seconds elapsed.\n"));
        assert!(text.contains("Workers (2 in total): 1 idle, 1 working, 0 dismissed."));
        assert!(text.contains(
            "Jobs (3 in total): 1 pending, 1 syncing, 0 broken, 0 failed, 1 completed."
        ));
        assert!(text.contains("Worker 0 (working) latest output:\n  b\n  c\n"));
        assert!(!text.contains("  a\n"));
    }

    #[test]
    fn screen_is_cleared_only_on_a_terminal() {
        let snap = ProgressSnapshot::capture(&[], &[], Duration::from_secs(3));
        let plain = frame(&snap, false);
        assert!(!plain.contains('\x1b'));
        assert!(plain.starts_with("3 seconds elapsed."));
        let tty = frame(&snap, true);
        assert!(tty.starts_with(CLEAR_SCREEN));
        assert!(tty.ends_with(&plain));
    }

    #[test]
    fn empty_run_renders() {
        let snap = ProgressSnapshot::capture(&[], &[], Duration::ZERO);
        assert!(snap.render().contains("Jobs (0 in total)"));
    }
}
