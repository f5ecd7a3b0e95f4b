//! External transfer seam.
//!
//! The run controller only knows how to hand a [`TransferCommand`] to a
//! [`Transfer`] and get back an exit code plus combined output. The real
//! implementation spawns the transfer program; tests plug in scripted ones.

mod command;
mod process;

use async_trait::async_trait;

pub use command::TransferCommand;
pub use process::ProcessTransfer;

/// Result of one transfer attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransferOutput {
    /// Process exit code; `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr, one line per `\n`.
    pub output: String,
}

/// Runs one transfer attempt to completion.
///
/// `on_line` is called for every output line as it arrives, so the progress
/// display can show live output. An `Err` means the program could not be run
/// at all (not found, not executable); a nonzero exit is an `Ok`.
#[async_trait]
pub trait Transfer: Send + Sync {
    async fn run(
        &self,
        command: &TransferCommand,
        on_line: &(dyn for<'l> Fn(&'l str) + Send + Sync),
    ) -> std::io::Result<TransferOutput>;
}
