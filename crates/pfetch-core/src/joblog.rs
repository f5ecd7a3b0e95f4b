//! Per-job and per-worker log files.
//!
//! Names are part of the external interface:
//! `fetch_completed.job_<id>.log`, `fetch_failed.job_<id>.log`,
//! `fetch_broken.job_<id>.try_<n>.log` and `fetch.worker_<id>.log`.

use std::io;
use std::path::PathBuf;

use crate::job::{JobId, WorkerId};

/// Which log an attempt's output goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobLogKind {
    Completed,
    Failed,
    /// Transient failure; `attempt` is 1-based.
    Broken { attempt: u32 },
}

impl JobLogKind {
    pub fn file_name(self, job: JobId) -> String {
        match self {
            JobLogKind::Completed => format!("fetch_completed.job_{job}.log"),
            JobLogKind::Failed => format!("fetch_failed.job_{job}.log"),
            JobLogKind::Broken { attempt } => format!("fetch_broken.job_{job}.try_{attempt}.log"),
        }
    }
}

/// Writes log files into one directory.
#[derive(Debug, Clone)]
pub struct JobLog {
    dir: PathBuf,
}

impl JobLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn job_path(&self, job: JobId, kind: JobLogKind) -> PathBuf {
        self.dir.join(kind.file_name(job))
    }

    pub fn worker_path(&self, worker: WorkerId) -> PathBuf {
        self.dir.join(format!("fetch.worker_{worker}.log"))
    }

    /// Persist one attempt's combined output.
    pub async fn write_job(&self, job: JobId, kind: JobLogKind, output: &str) -> io::Result<PathBuf> {
        let path = self.job_path(job, kind);
        tokio::fs::write(&path, output).await?;
        Ok(path)
    }

    /// Persist a worker's full transcript (at worker shutdown).
    pub async fn write_worker(&self, worker: WorkerId, transcript: &str) -> io::Result<PathBuf> {
        let path = self.worker_path(worker);
        tokio::fs::write(&path, transcript).await?;
        Ok(path)
    }
}
