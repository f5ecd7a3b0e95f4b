//! CLI for pfetch.

mod summary;

use anyhow::Result;
use clap::Parser;
use pfetch_core::config::{self, FetchConfig};
use pfetch_core::run::{run_fetch, FetchRequest};
use pfetch_core::transfer::ProcessTransfer;
use std::path::PathBuf;
use std::sync::Arc;

/// Mirror remote directories and files in parallel through rsync, retrying transient failures.
#[derive(Debug, Parser)]
#[command(name = "pfetch")]
#[command(
    about = "Mirror remote directories in parallel through rsync, retrying transient failures",
    long_about = None
)]
pub struct Cli {
    /// Options for the transfer program, passed as a single argument (e.g. "-av"); "" for none.
    #[arg(allow_hyphen_values = true)]
    pub transfer_opts: String,

    /// Remote root (URL or path) prepended to every manifest entry.
    pub remote_root: String,

    /// Text file listing one remote path per line, relative to the remote root.
    pub manifest: PathBuf,

    /// Local destination root; created if absent.
    pub local_dest: PathBuf,

    /// Number of parallel workers (default from config, 4).
    pub concurrency: Option<usize>,

    /// Retries per job for transient failures.
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Transfer program to invoke instead of rsync.
    #[arg(long, value_name = "PATH")]
    pub program: Option<String>,

    /// Lowest exit code treated as transient (rsync: 20).
    #[arg(long, value_name = "CODE")]
    pub retry_threshold: Option<i32>,

    /// Progress refresh interval in milliseconds.
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Directory for job and worker log files (default: current directory).
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Write a JSON report of every job's final state to FILE.
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Do not draw the live progress display.
    #[arg(long)]
    pub quiet: bool,
}

impl Cli {
    /// Command-line values override the config file.
    pub fn apply(&self, mut cfg: FetchConfig) -> FetchConfig {
        if let Some(n) = self.concurrency {
            cfg.concurrency = n;
        }
        if let Some(n) = self.retries {
            cfg.retry_budget = n;
        }
        if let Some(program) = &self.program {
            cfg.transfer_program = program.clone();
        }
        if let Some(code) = self.retry_threshold {
            cfg.retry_threshold = code;
        }
        if let Some(ms) = self.interval_ms {
            cfg.progress_interval_ms = ms;
        }
        if let Some(dir) = &self.log_dir {
            cfg.log_dir = Some(dir.clone());
        }
        cfg
    }

    pub fn into_request(self, cfg: FetchConfig) -> FetchRequest {
        let config = self.apply(cfg);
        FetchRequest {
            transfer_opts: self.transfer_opts,
            remote_root: self.remote_root,
            manifest: self.manifest,
            local_dest: self.local_dest,
            config,
            show_progress: !self.quiet,
        }
    }

    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = match config::load_or_init() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!("could not load config ({:#}); using defaults", e);
                FetchConfig::default()
            }
        };
        tracing::debug!("loaded config: {:?}", cfg);

        let report = cli.report.clone();
        let request = cli.into_request(cfg);
        let summary = run_fetch(request, Arc::new(ProcessTransfer)).await?;

        summary::print_summary(&summary);
        if let Some(path) = report {
            summary.write_json(&path)?;
            tracing::info!("run report written to {}", path.display());
        }
        Ok(())
    }
}
