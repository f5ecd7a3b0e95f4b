//! Final run summary: tally for the console and an optional JSON report.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::job::{EntryKind, Job, JobId, JobStatus};
use crate::progress::JobCounts;

/// Final state of one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub id: JobId,
    pub entry: String,
    pub kind: EntryKind,
    pub remote_path: String,
    pub local_path: PathBuf,
    pub status: JobStatus,
    pub attempts: u32,
    pub retries_left: u32,
    pub exit_code: Option<i32>,
}

impl From<&Job> for JobReport {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            entry: job.entry.clone(),
            kind: job.kind,
            remote_path: job.remote_path.clone(),
            local_path: job.local_path.clone(),
            status: job.status(),
            attempts: job.attempts(),
            retries_left: job.retries_left(),
            exit_code: job.exit_code,
        }
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub elapsed_secs: f64,
    pub jobs: Vec<JobReport>,
}

impl RunSummary {
    pub fn from_jobs(jobs: &[Job], elapsed: Duration) -> Self {
        let mut counts = JobCounts::default();
        for job in jobs {
            counts.add(job.status());
        }
        Self {
            total: jobs.len(),
            completed: counts.completed,
            failed: counts.failed,
            elapsed_secs: elapsed.as_secs_f64(),
            jobs: jobs.iter().map(JobReport::from).collect(),
        }
    }

    /// e.g. `3 completed, 1 failed`.
    pub fn tally(&self) -> String {
        format!("{} completed, {} failed", self.completed, self.failed)
    }

    pub fn all_completed(&self) -> bool {
        self.completed == self.total
    }

    /// Jobs that did not complete, in manifest order.
    pub fn failures(&self) -> impl Iterator<Item = &JobReport> {
        self.jobs
            .iter()
            .filter(|j| j.status != JobStatus::Completed)
    }

    /// Write the summary as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serialize run report")?;
        std::fs::write(path, json)
            .with_context(|| format!("write run report: {}", path.display()))?;
        Ok(())
    }
}
