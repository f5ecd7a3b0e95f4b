//! Start the dispatcher, workers and reporter; block until every job is
//! terminal; shut down in order.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

use crate::config::FetchConfig;
use crate::dispatch::Dispatcher;
use crate::job::{Job, JobTemplate};
use crate::joblog::JobLog;
use crate::manifest;
use crate::progress;
use crate::report::RunSummary;
use crate::retry::RetryPolicy;
use crate::transfer::Transfer;
use crate::worker::{run_worker, Worker, WorkerContext};

use super::setup::plan_jobs;
use super::state::RunState;

/// One invocation: what to fetch, from where, to where, and how.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Passed verbatim to the transfer program as a single argument.
    pub transfer_opts: String,
    pub remote_root: String,
    pub manifest: PathBuf,
    pub local_dest: PathBuf,
    pub config: FetchConfig,
    /// Draw the live progress display on stdout.
    pub show_progress: bool,
}

/// Execution knobs for [`execute_jobs`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub concurrency: usize,
    pub policy: RetryPolicy,
    pub recent_output_lines: usize,
    pub dispatch_interval: Duration,
    pub progress_interval: Duration,
    pub show_progress: bool,
    pub log_dir: PathBuf,
}

impl RunOptions {
    pub fn from_config(cfg: &FetchConfig) -> Self {
        Self {
            concurrency: cfg.concurrency.max(1),
            policy: cfg.retry_policy(),
            recent_output_lines: cfg.recent_output_lines,
            dispatch_interval: cfg.dispatch_interval(),
            progress_interval: cfg.progress_interval(),
            show_progress: false,
            log_dir: cfg.log_dir(),
        }
    }
}

/// Full run: read the manifest, prepare the destination, fetch everything.
///
/// Errors are startup failures only (bad config, unreadable manifest,
/// uncreatable destination). Failed jobs are reported in the summary.
pub async fn run_fetch(request: FetchRequest, transfer: Arc<dyn Transfer>) -> Result<RunSummary> {
    let cfg = &request.config;
    cfg.validate()?;

    let entries = manifest::read_manifest(&request.manifest)?;
    let template = JobTemplate {
        program: cfg.transfer_program.clone(),
        transfer_opts: request.transfer_opts.clone(),
        remote_root: request.remote_root.clone(),
        local_root: request.local_dest.clone(),
        single_file_extensions: cfg.single_file_extensions.clone(),
        retry_budget: cfg.retry_budget,
    };
    let jobs = plan_jobs(&template, &entries)?;

    let log_dir = cfg.log_dir();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("create log directory: {}", log_dir.display()))?;

    let mut opts = RunOptions::from_config(cfg);
    opts.show_progress = request.show_progress;
    Ok(execute_jobs(jobs, &opts, transfer).await)
}

/// Run prepared jobs to completion with a fixed worker pool.
pub async fn execute_jobs(jobs: Vec<Job>, opts: &RunOptions, transfer: Arc<dyn Transfer>) -> RunSummary {
    let concurrency = opts.concurrency.max(1);
    let total = jobs.len();
    let workers = (0..concurrency)
        .map(|id| Worker::new(id, opts.recent_output_lines))
        .collect();
    let state = Arc::new(RunState::new(jobs, workers));
    let joblog = JobLog::new(opts.log_dir.clone());
    tracing::info!(jobs = total, workers = concurrency, "fetch run started");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut worker_tasks = JoinSet::new();
    let mut senders = Vec::with_capacity(concurrency);
    for id in 0..concurrency {
        let (tx, rx) = mpsc::channel(1);
        senders.push(tx);
        let ctx = WorkerContext {
            id,
            state: Arc::clone(&state),
            transfer: Arc::clone(&transfer),
            policy: opts.policy,
            joblog: joblog.clone(),
        };
        worker_tasks.spawn(run_worker(ctx, rx));
    }

    let dispatcher = Dispatcher::new(Arc::clone(&state), senders, opts.dispatch_interval);
    let dispatcher = tokio::spawn(dispatcher.run(shutdown_rx.clone()));

    let reporter = opts.show_progress.then(|| {
        tokio::spawn(progress::run_reporter(
            Arc::clone(&state),
            opts.progress_interval,
            shutdown_rx.clone(),
        ))
    });

    state.all_terminal().await;
    tracing::info!("all jobs terminal; shutting down");

    let _ = shutdown_tx.send(true);
    if let Some(reporter) = reporter {
        if let Err(e) = reporter.await {
            tracing::warn!("progress reporter task: {}", e);
        }
    }
    if let Err(e) = dispatcher.await {
        tracing::warn!("dispatcher task: {}", e);
    }

    // The dispatcher has dropped every worker channel; workers drain and exit.
    state.dismiss_workers();
    while let Some(res) = worker_tasks.join_next().await {
        if let Err(e) = res {
            tracing::warn!("worker task: {}", e);
        }
    }

    if opts.show_progress {
        progress::draw(&state.snapshot());
    }

    let summary = RunSummary::from_jobs(&state.jobs(), state.elapsed());
    tracing::info!(
        completed = summary.completed,
        failed = summary.failed,
        elapsed_secs = summary.elapsed_secs,
        "fetch run finished"
    );
    summary
}
