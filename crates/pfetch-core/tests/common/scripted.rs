//! In-process transfer stub: exit codes scripted per entry, with
//! instrumentation for concurrent execution.

use async_trait::async_trait;
use pfetch_core::transfer::{Transfer, TransferCommand, TransferOutput};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub struct ScriptedTransfer {
    /// (entry, exit codes for invocations 1, 2, ...)
    scripts: Vec<(String, Vec<i32>)>,
    /// Exit code once a script runs out, and for unscripted entries.
    default_code: i32,
    delay: Duration,
    calls: Mutex<HashMap<String, u32>>,
    running: Mutex<HashMap<String, usize>>,
    max_running: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransfer {
    pub fn new(default_code: i32) -> Self {
        Self {
            scripts: Vec::new(),
            default_code,
            delay: Duration::from_millis(5),
            calls: Mutex::new(HashMap::new()),
            running: Mutex::new(HashMap::new()),
            max_running: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn script(mut self, entry: &str, codes: &[i32]) -> Self {
        self.scripts.push((entry.to_string(), codes.to_vec()));
        self
    }

    /// Invocations seen for `entry`.
    pub fn calls(&self, entry: &str) -> u32 {
        let calls = self.calls.lock().unwrap();
        calls
            .iter()
            .filter(|(source, _)| matches_entry(source, entry))
            .map(|(_, n)| *n)
            .sum()
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    /// Highest number of simultaneous runs of any single source.
    pub fn max_concurrent_per_source(&self) -> usize {
        self.max_running
            .lock()
            .unwrap()
            .values()
            .copied()
            .max()
            .unwrap_or(0)
    }

    /// Highest number of simultaneous runs overall.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn code_for(&self, source: &str, attempt: u32) -> i32 {
        self.scripts
            .iter()
            .find(|(entry, _)| matches_entry(source, entry))
            .and_then(|(_, codes)| codes.get(attempt as usize - 1).copied())
            .unwrap_or(self.default_code)
    }
}

fn matches_entry(source: &str, entry: &str) -> bool {
    source.ends_with(&format!("/{}", entry.trim_matches('/')))
}

#[async_trait]
impl Transfer for ScriptedTransfer {
    async fn run(
        &self,
        command: &TransferCommand,
        on_line: &(dyn for<'l> Fn(&'l str) + Send + Sync),
    ) -> io::Result<TransferOutput> {
        let source = command
            .source()
            .to_string_lossy()
            .trim_end_matches('/')
            .to_string();
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(source.clone()).or_insert(0);
            *n += 1;
            *n
        };
        {
            let mut running = self.running.lock().unwrap();
            let now = running.entry(source.clone()).or_insert(0);
            *now += 1;
            let mut max = self.max_running.lock().unwrap();
            let m = max.entry(source.clone()).or_insert(0);
            *m = (*m).max(*now);
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let line = format!("sending {source} (attempt {attempt})");
        on_line(&line);
        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if let Some(n) = self.running.lock().unwrap().get_mut(&source) {
            *n -= 1;
        }

        Ok(TransferOutput {
            exit_code: Some(self.code_for(&source, attempt)),
            output: format!("{line}\n"),
        })
    }
}

/// Transfer whose every run panics partway through.
pub struct PanickingTransfer;

#[async_trait]
impl Transfer for PanickingTransfer {
    async fn run(
        &self,
        command: &TransferCommand,
        on_line: &(dyn for<'l> Fn(&'l str) + Send + Sync),
    ) -> io::Result<TransferOutput> {
        on_line("starting");
        tokio::task::yield_now().await;
        panic!("transfer blew up on {}", command.source().to_string_lossy());
    }
}
