//! Transfer backed by a real subprocess (rsync by default).

use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::{Transfer, TransferCommand, TransferOutput};

/// Spawns `command.program` with `command.args`, streaming stdout and stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessTransfer;

#[async_trait]
impl Transfer for ProcessTransfer {
    async fn run(
        &self,
        command: &TransferCommand,
        on_line: &(dyn for<'l> Fn(&'l str) + Send + Sync),
    ) -> io::Result<TransferOutput> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "child stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "child stderr not captured"))?;

        let mut out = BufReader::new(stdout);
        let mut err = BufReader::new(stderr);
        let mut out_buf = Vec::new();
        let mut err_buf = Vec::new();
        let mut out_open = true;
        let mut err_open = true;
        let mut combined = String::new();

        // Partial reads stay in the buffers, so a branch losing the race is resumed next turn.
        while out_open || err_open {
            tokio::select! {
                read = out.read_until(b'\n', &mut out_buf), if out_open => {
                    if read? == 0 {
                        out_open = false;
                    }
                    take_line(&mut out_buf, &mut combined, on_line);
                }
                read = err.read_until(b'\n', &mut err_buf), if err_open => {
                    if read? == 0 {
                        err_open = false;
                    }
                    take_line(&mut err_buf, &mut combined, on_line);
                }
            }
        }

        let status = child.wait().await?;
        Ok(TransferOutput {
            exit_code: status.code(),
            output: combined,
        })
    }
}

/// Move one buffered line (lossy UTF-8, line ending stripped) into `combined`.
fn take_line(
    buf: &mut Vec<u8>,
    combined: &mut String,
    on_line: &(dyn for<'l> Fn(&'l str) + Send + Sync),
) {
    if buf.is_empty() {
        return;
    }
    {
        let text = String::from_utf8_lossy(buf);
        let line = text.trim_end_matches(|c| c == '\n' || c == '\r');
        on_line(line);
        combined.push_str(line);
        combined.push('\n');
    }
    buf.clear();
}
