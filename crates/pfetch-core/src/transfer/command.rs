//! A fully formed transfer invocation.

use std::ffi::{OsStr, OsString};
use std::fmt;

/// `<program> [<opts>] <source> <dest>`, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCommand {
    pub program: String,
    pub args: Vec<OsString>,
}

impl TransferCommand {
    /// Build an invocation. `opts` is passed through as one argument and
    /// omitted when blank, so an empty option string never reaches the tool
    /// as a bogus source path.
    pub fn new(
        program: impl Into<String>,
        opts: &str,
        source: impl Into<OsString>,
        dest: impl Into<OsString>,
    ) -> Self {
        let mut args = Vec::with_capacity(3);
        if !opts.trim().is_empty() {
            args.push(OsString::from(opts));
        }
        args.push(source.into());
        args.push(dest.into());
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn source(&self) -> &OsStr {
        &self.args[self.args.len() - 2]
    }

    pub fn dest(&self) -> &OsStr {
        &self.args[self.args.len() - 1]
    }
}

impl fmt::Display for TransferCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}
