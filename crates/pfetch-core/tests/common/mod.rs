//! Shared helpers for run-level tests.

#![allow(dead_code)]

pub mod scripted;

use pfetch_core::config::FetchConfig;
use pfetch_core::run::FetchRequest;
use std::path::{Path, PathBuf};

pub const REMOTE_ROOT: &str = "rsync://host/repo";

/// Write `entries` as a manifest under `dir` and build a request that mirrors
/// into `dir/dest`, with logs in `dir/logs`.
pub fn request(dir: &Path, entries: &[&str], concurrency: usize) -> FetchRequest {
    let manifest = dir.join("manifest.txt");
    std::fs::write(&manifest, entries.join("\n")).unwrap();
    let logs = dir.join("logs");
    std::fs::create_dir_all(&logs).unwrap();
    FetchRequest {
        transfer_opts: "-av".to_string(),
        remote_root: REMOTE_ROOT.to_string(),
        manifest,
        local_dest: dir.join("dest"),
        config: FetchConfig {
            concurrency,
            dispatch_interval_ms: 10,
            log_dir: Some(logs),
            ..FetchConfig::default()
        },
        show_progress: false,
    }
}

/// Log file names in `dir` starting with `prefix`, sorted.
pub fn logs_with_prefix(dir: &Path, prefix: &str) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with(prefix))
        .collect();
    names.sort();
    names
}

pub fn log_dir(req: &FetchRequest) -> PathBuf {
    req.config.log_dir.clone().unwrap()
}

/// Walk a worker transcript and check that every attempt the worker started
/// reached an outcome before its next attempt began. Returns the number of
/// attempts the worker ran.
pub fn serial_attempts(transcript: &str) -> usize {
    let mut open: Option<String> = None;
    let mut attempts = 0;
    for line in transcript.lines() {
        let Some(rest) = line.strip_prefix("job ") else {
            continue;
        };
        let Some((job, event)) = rest.split_once(": ") else {
            continue;
        };
        if event.starts_with("attempt ") {
            assert!(
                open.is_none(),
                "job {job} started while job {:?} was still running",
                open
            );
            open = Some(job.to_string());
            attempts += 1;
        } else if ["completed (", "broken (", "failed ("]
            .iter()
            .any(|p| event.starts_with(p))
        {
            assert_eq!(open.as_deref(), Some(job), "outcome for a job not running");
            open = None;
        }
    }
    assert!(open.is_none(), "transcript ends mid-attempt");
    attempts
}
