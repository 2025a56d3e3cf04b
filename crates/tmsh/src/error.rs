//! Error types for tmsh sessions and file transfers.
//!
//! The one condition callers routinely match on is [`Error::CommandFailed`]:
//! the remote shell ran the command and returned a non-zero status. tmsh uses
//! that both for real failures and for "object not found", so callers decide
//! what it means. Everything else is a transport or local problem.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while talking to the appliance.
#[derive(Debug, Error)]
pub enum Error {
    /// The remote shell exited non-zero
    #[error("remote command `{command}` failed{}{}", exit_suffix(.code), output_suffix(.stderr))]
    CommandFailed {
        /// The command line sent to the shell
        command: String,
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Captured standard output
        stdout: String,
        /// Captured standard error
        stderr: String,
    },

    /// The final scp attempt failed
    #[error(
        "failed to copy `{}` to remote path `{remote}`{}{}",
        .local.display(),
        exit_suffix(.code),
        output_suffix(.stderr)
    )]
    TransferFailed {
        /// Local source file
        local: PathBuf,
        /// Destination path on the appliance
        remote: String,
        /// Exit code of the last scp invocation
        code: Option<i32>,
        /// Captured standard output of the last scp invocation
        stdout: String,
        /// Captured standard error of the last scp invocation
        stderr: String,
    },

    /// The ssh control master could not be started
    #[error("could not open ssh session to {host}{}{}", exit_suffix(.code), output_suffix(.stderr))]
    ConnectFailed {
        /// Destination passed to ssh
        host: String,
        /// Exit code of the master process
        code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// A required program is not installed
    #[error("`{program}` not found in PATH")]
    ProgramNotFound {
        /// Program name
        program: String,
    },

    /// A program exists but could not be started
    #[error("failed to execute `{program}`: {source}")]
    Spawn {
        /// Program name or path
        program: String,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Returns true if the remote shell ran the command and rejected it.
    pub fn is_command_failure(&self) -> bool {
        matches!(self, Error::CommandFailed { .. })
    }

    /// Returns true if a file transfer failed after protocol negotiation.
    pub fn is_transfer_failure(&self) -> bool {
        matches!(self, Error::TransferFailed { .. })
    }

    /// Exit code reported by the failing process, if any.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::CommandFailed { code, .. }
            | Error::TransferFailed { code, .. }
            | Error::ConnectFailed { code, .. } => *code,
            _ => None,
        }
    }
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" (exit status {code})"),
        None => " (terminated by signal)".to_string(),
    }
}

fn output_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Result type for tmsh operations
pub type Result<T> = std::result::Result<T, Error>;
