//! Diagnostics for pfetch runs.
//!
//! Events go to `$XDG_STATE_HOME/pfetch/pfetch.log`. Stdout is reserved for
//! the progress display and the final tally, so nothing logged lands there.

use anyhow::Result;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,pfetch=debug,pfetch_core=debug";

/// Destination of one log event.
enum LogSink {
    File(fs::File),
    /// The log file handle could not be duplicated for this event.
    Stderr,
}

impl io::Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            LogSink::File(f) => f.write(buf),
            LogSink::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            LogSink::File(f) => f.flush(),
            LogSink::Stderr => io::stderr().lock().flush(),
        }
    }
}

/// Shared append handle on the run log; every event gets its own clone.
struct RunLog(fs::File);

impl<'a> MakeWriter<'a> for RunLog {
    type Writer = LogSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.0
            .try_clone()
            .map(LogSink::File)
            .unwrap_or(LogSink::Stderr)
    }
}

/// `RUST_LOG` if set and valid, else [`DEFAULT_FILTER`].
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// `$XDG_STATE_HOME/pfetch/pfetch.log`, creating the directory on the way.
pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("pfetch")?;
    Ok(xdg_dirs.place_state_file("pfetch.log")?)
}

/// Send pfetch's diagnostics to the run log, appending across runs.
///
/// Returns an error when the state directory or the file is unusable; the
/// binary then switches to [`init_logging_stderr`].
pub fn init_logging() -> Result<()> {
    let path = log_file_path()?;
    let file = fs::OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(BoxMakeWriter::new(RunLog(file)))
        .with_ansi(false)
        .init();

    tracing::info!("pfetch run log: {}", path.display());
    Ok(())
}

/// Same filter as [`init_logging`], written to stderr.
pub fn init_logging_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}
