//! Job model: one fetch unit (remote path -> local path), its lifecycle
//! state, and its retry budget.
//!
//! Jobs are plain data. Status changes go through the methods below, which
//! refuse anything [`JobStatus::can_transition_to`] does not allow.

mod kind;
mod status;

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use crate::transfer::TransferCommand;

pub use kind::{classify_entry, EntryKind, DEFAULT_SINGLE_FILE_EXTENSIONS};
pub use status::{JobStatus, TransitionError};

/// Job identifier: the entry's index in the manifest.
pub type JobId = usize;

/// Worker identifier: index into the worker pool.
pub type WorkerId = usize;

/// Everything needed to turn manifest entries into jobs.
#[derive(Debug, Clone)]
pub struct JobTemplate {
    pub program: String,
    pub transfer_opts: String,
    /// Remote base (URL or path) prepended to every entry.
    pub remote_root: String,
    /// Local destination root.
    pub local_root: PathBuf,
    pub single_file_extensions: Vec<String>,
    pub retry_budget: u32,
}

impl JobTemplate {
    /// Build the job for `entry`. Pure: nothing touches the filesystem until
    /// [`Job::prepare_destination`].
    pub fn build(&self, id: JobId, entry: &str) -> Job {
        let kind = classify_entry(entry, &self.single_file_extensions);
        let rel = entry.trim_matches('/');
        let local_path = if rel.is_empty() {
            self.local_root.clone()
        } else {
            self.local_root.join(rel)
        };
        let mut remote_path = join_remote(&self.remote_root, rel);

        let dest: OsString = match kind {
            EntryKind::File => local_path.clone().into_os_string(),
            EntryKind::Directory => {
                if !remote_path.ends_with('/') {
                    remote_path.push('/');
                }
                with_trailing_slash(&local_path)
            }
        };
        let command = TransferCommand::new(
            self.program.clone(),
            &self.transfer_opts,
            remote_path.clone(),
            dest,
        );

        Job {
            id,
            entry: entry.to_string(),
            kind,
            remote_path,
            local_path,
            command,
            status: JobStatus::Pending,
            assigned_worker: None,
            retries_left: self.retry_budget,
            attempts: 0,
            exit_code: None,
            output_log: String::new(),
        }
    }
}

/// Join `root` and `rel` with exactly one `/`.
fn join_remote(root: &str, rel: &str) -> String {
    let root = root.trim_end_matches('/');
    match (root.is_empty(), rel.is_empty()) {
        (true, _) => rel.to_string(),
        (false, true) => root.to_string(),
        (false, false) => format!("{root}/{rel}"),
    }
}

fn with_trailing_slash(path: &Path) -> OsString {
    let mut s = path.as_os_str().to_owned();
    if !s.to_string_lossy().ends_with('/') {
        s.push("/");
    }
    s
}

/// One fetch unit.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    /// The manifest line this job came from.
    pub entry: String,
    pub kind: EntryKind,
    pub remote_path: String,
    pub local_path: PathBuf,
    pub command: TransferCommand,
    status: JobStatus,
    /// Worker currently (or last) holding this job.
    pub assigned_worker: Option<WorkerId>,
    retries_left: u32,
    attempts: u32,
    /// Exit code of the last attempt.
    pub exit_code: Option<i32>,
    /// Combined output of the last attempt.
    pub output_log: String,
}

impl Job {
    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn retries_left(&self) -> u32 {
        self.retries_left
    }

    /// Attempts started so far (the current one included while syncing).
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Create the local directory this job writes into. Idempotent: existing
    /// directories (e.g. a parent shared with another entry) are fine.
    pub fn prepare_destination(&self) -> io::Result<()> {
        let dir = match self.kind {
            EntryKind::Directory => Some(self.local_path.as_path()),
            EntryKind::File => self.local_path.parent(),
        };
        match dir {
            Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
            _ => Ok(()),
        }
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError::Illegal {
                job: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// `pending -> syncing` on behalf of `worker`. Returns the 1-based attempt number.
    pub fn begin_attempt(&mut self, worker: WorkerId) -> Result<u32, TransitionError> {
        if self.assigned_worker != Some(worker) {
            return Err(TransitionError::NotAssigned {
                job: self.id,
                worker,
                assigned: self.assigned_worker,
            });
        }
        self.transition(JobStatus::Syncing)?;
        self.attempts += 1;
        self.output_log.clear();
        Ok(self.attempts)
    }

    /// `syncing -> completed | failed | broken` with the attempt's result.
    pub fn finish_attempt(
        &mut self,
        next: JobStatus,
        exit_code: Option<i32>,
        output: String,
    ) -> Result<(), TransitionError> {
        if self.status != JobStatus::Syncing || next == JobStatus::Pending {
            return Err(TransitionError::Illegal {
                job: self.id,
                from: self.status,
                to: next,
            });
        }
        self.transition(next)?;
        self.exit_code = exit_code;
        self.output_log = output;
        Ok(())
    }

    /// Recycle a broken job: back to `pending` (unassigned, so any worker can
    /// take it) while retries remain, otherwise `failed` for good.
    pub fn recycle(&mut self) -> Result<JobStatus, TransitionError> {
        if self.status != JobStatus::Broken {
            return Err(TransitionError::Illegal {
                job: self.id,
                from: self.status,
                to: JobStatus::Pending,
            });
        }
        if self.retries_left > 0 {
            self.retries_left -= 1;
            self.transition(JobStatus::Pending)?;
            self.assigned_worker = None;
        } else {
            self.transition(JobStatus::Failed)?;
        }
        Ok(self.status)
    }
}
