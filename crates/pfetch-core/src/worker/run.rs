//! Worker execution loop: claim a dispatched job, run its transfer, record the outcome.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::job::{JobId, JobStatus, WorkerId};
use crate::joblog::{JobLog, JobLogKind};
use crate::retry::RetryPolicy;
use crate::run::RunState;
use crate::transfer::{Transfer, TransferCommand, TransferOutput};

/// What a worker does with a job it was handed.
enum Step {
    Execute {
        command: TransferCommand,
        attempt: u32,
    },
    Recycle,
    Conflict,
    Skip,
}

/// Everything one worker loop needs.
pub(crate) struct WorkerContext {
    pub(crate) id: WorkerId,
    pub(crate) state: Arc<RunState>,
    pub(crate) transfer: Arc<dyn Transfer>,
    pub(crate) policy: RetryPolicy,
    pub(crate) joblog: JobLog,
}

/// Runs until the dispatcher drops this worker's channel, then writes the
/// worker's transcript to `fetch.worker_<id>.log`.
pub(crate) async fn run_worker(ctx: WorkerContext, mut jobs: mpsc::Receiver<JobId>) {
    let mut transcript = String::new();
    tracing::debug!(worker = ctx.id, "worker started");

    while let Some(job_id) = jobs.recv().await {
        ctx.handle(job_id, &mut transcript).await;
        ctx.state.wake_dispatcher();
    }

    if let Err(e) = ctx.joblog.write_worker(ctx.id, &transcript).await {
        tracing::warn!(worker = ctx.id, "could not write worker log: {}", e);
    }
    tracing::debug!(worker = ctx.id, "worker dismissed");
}

impl WorkerContext {
    async fn handle(&self, job_id: JobId, transcript: &mut String) {
        match self.claim(job_id) {
            Step::Execute { command, attempt } => {
                self.execute(job_id, command, attempt, transcript).await;
            }
            Step::Recycle => self.recycle(job_id, transcript).await,
            Step::Conflict => {
                self.note(transcript, format!("conflict: job {job_id} is already syncing"));
            }
            Step::Skip => {}
        }
    }

    /// Inspect the job under the lock and, if it is pending and ours, mark it syncing.
    fn claim(&self, job_id: JobId) -> Step {
        let mut guard = self.state.lock();
        let reg = &mut *guard;
        let Some(job) = reg.jobs.get_mut(job_id) else {
            tracing::warn!(worker = self.id, job = job_id, "dispatched unknown job");
            return Step::Skip;
        };
        if job.assigned_worker != Some(self.id) {
            tracing::warn!(
                worker = self.id,
                job = job_id,
                assigned = ?job.assigned_worker,
                "job is assigned elsewhere; ignoring"
            );
            return Step::Skip;
        }
        match job.status() {
            JobStatus::Pending => match job.begin_attempt(self.id) {
                Ok(attempt) => {
                    if let Some(w) = reg.workers.get_mut(self.id) {
                        w.set_working(true);
                    }
                    Step::Execute {
                        command: job.command.clone(),
                        attempt,
                    }
                }
                Err(e) => {
                    tracing::warn!(worker = self.id, "{}", e);
                    Step::Skip
                }
            },
            JobStatus::Syncing => {
                tracing::warn!(
                    worker = self.id,
                    job = job_id,
                    "dispatch conflict: job is already syncing"
                );
                Step::Conflict
            }
            JobStatus::Broken => Step::Recycle,
            JobStatus::Failed | JobStatus::Completed => Step::Skip,
        }
    }

    async fn execute(
        &self,
        job_id: JobId,
        command: TransferCommand,
        attempt: u32,
        transcript: &mut String,
    ) {
        self.note(
            transcript,
            format!("job {job_id}: attempt {attempt}: {command}"),
        );
        tracing::info!(worker = self.id, job = job_id, attempt, "transfer started");

        let (exit_code, mut output, next) = match self.attempt(command).await {
            Ok(out) => {
                let next = self.policy.classify(out.exit_code).job_status();
                (out.exit_code, out.output, next)
            }
            Err(reason) => {
                tracing::warn!(worker = self.id, job = job_id, "{}", reason);
                (None, format!("{reason}\n"), JobStatus::Failed)
            }
        };
        transcript.push_str(&output);

        let marker = outcome_marker(job_id, next, exit_code);
        output.push_str(&marker);
        output.push('\n');

        let became_terminal = {
            let mut guard = self.state.lock();
            let reg = &mut *guard;
            let finished = reg
                .jobs
                .get_mut(job_id)
                .map(|job| job.finish_attempt(next, exit_code, output.clone()));
            if let Some(w) = reg.workers.get_mut(self.id) {
                w.set_working(false);
            }
            match finished {
                Some(Ok(())) => next.is_terminal(),
                Some(Err(e)) => {
                    tracing::warn!(worker = self.id, "{}", e);
                    false
                }
                None => false,
            }
        };
        self.note(transcript, marker);
        if became_terminal {
            self.state.job_terminal();
        }

        match next {
            JobStatus::Completed => {
                tracing::info!(worker = self.id, job = job_id, attempt, "job completed");
                self.persist(job_id, JobLogKind::Completed, &output).await;
            }
            JobStatus::Failed => {
                tracing::warn!(worker = self.id, job = job_id, exit_code = ?exit_code, "job failed");
                self.persist(job_id, JobLogKind::Failed, &output).await;
            }
            _ => {
                tracing::info!(worker = self.id, job = job_id, exit_code = ?exit_code, attempt, "job broken");
                self.persist(job_id, JobLogKind::Broken { attempt }, &output)
                    .await;
                self.recycle(job_id, transcript).await;
            }
        }
    }

    /// Run the transfer in its own task so a panicking implementation fails
    /// the job instead of taking the worker down with it.
    async fn attempt(&self, command: TransferCommand) -> Result<TransferOutput, String> {
        let state = Arc::clone(&self.state);
        let transfer = Arc::clone(&self.transfer);
        let worker = self.id;
        let program = command.program.clone();
        let task = tokio::spawn(async move {
            let on_line = move |line: &str| state.push_output(worker, line);
            transfer.run(&command, &on_line).await
        });
        match task.await {
            Ok(Ok(out)) => Ok(out),
            Ok(Err(e)) => Err(format!("could not run {program}: {e}")),
            Err(e) if e.is_panic() => Err(format!("transfer via {program} panicked")),
            Err(e) => Err(format!("transfer via {program} aborted: {e}")),
        }
    }

    /// Broken job: requeue while retries remain, otherwise fail it for good.
    async fn recycle(&self, job_id: JobId, transcript: &mut String) {
        let outcome = {
            let mut reg = self.state.lock();
            reg.jobs
                .get_mut(job_id)
                .map(|job| (job.recycle(), job.retries_left(), job.output_log.clone()))
        };
        match outcome {
            Some((Ok(JobStatus::Pending), left, _)) => {
                self.note(
                    transcript,
                    format!("job {job_id}: will retry ({left} retries left)"),
                );
            }
            Some((Ok(_), _, output)) => {
                self.note(transcript, format!("job {job_id}: no retries left, giving up"));
                tracing::warn!(worker = self.id, job = job_id, "retry budget exhausted");
                self.state.job_terminal();
                self.persist(job_id, JobLogKind::Failed, &output).await;
            }
            Some((Err(e), ..)) => tracing::warn!(worker = self.id, "{}", e),
            None => {}
        }
    }

    async fn persist(&self, job_id: JobId, kind: JobLogKind, output: &str) {
        match self.joblog.write_job(job_id, kind, output).await {
            Ok(path) => tracing::debug!(job = job_id, path = %path.display(), "job log written"),
            Err(e) => tracing::warn!(job = job_id, "could not write job log: {}", e),
        }
    }

    /// Status line for the progress display and the worker transcript.
    fn note(&self, transcript: &mut String, line: String) {
        self.state.push_output(self.id, &line);
        transcript.push_str(&line);
        transcript.push('\n');
    }
}

fn outcome_marker(job_id: JobId, status: JobStatus, exit_code: Option<i32>) -> String {
    let code = exit_code.map_or_else(|| "none".to_string(), |c| c.to_string());
    match status {
        JobStatus::Completed => format!("job {job_id}: completed (exit {code})"),
        JobStatus::Broken => format!("job {job_id}: broken (exit {code})"),
        _ => format!("job {job_id}: failed (exit {code})"),
    }
}
