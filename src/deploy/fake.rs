//! Scripted [`Channel`] that records what the steps ask of it.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tmsh::{Channel, CommandOutput};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub local: PathBuf,
    pub remote: String,
    /// Size of the local file when it was sent
    pub size: u64,
}

/// Commands succeed with empty output unless scripted otherwise.
#[derive(Debug, Default)]
pub struct FakeChannel {
    pub commands: Vec<String>,
    pub transfers: Vec<Transfer>,
    responses: HashMap<String, String>,
    failures: Vec<String>,
    fail_transfers: bool,
    disconnected: bool,
}

impl FakeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, command: &str, stdout: &str) -> Self {
        self.responses.insert(command.to_string(), stdout.to_string());
        self
    }

    /// Make `command` exit non-zero.
    pub fn fail(mut self, command: &str) -> Self {
        self.failures.push(command.to_string());
        self
    }

    pub fn fail_transfers(mut self) -> Self {
        self.fail_transfers = true;
        self
    }

    /// Every call fails as if the ssh session could not be opened.
    pub fn disconnected(mut self) -> Self {
        self.disconnected = true;
        self
    }

    fn connect_error(&self) -> tmsh::Error {
        tmsh::Error::ConnectFailed {
            host: self.host().to_string(),
            code: Some(255),
            stderr: "ssh: connect to host bigip port 22: Connection refused".to_string(),
        }
    }
}

impl Channel for FakeChannel {
    fn host(&self) -> &str {
        "bigip"
    }

    fn run(&mut self, command: &str) -> tmsh::Result<CommandOutput> {
        if self.disconnected {
            return Err(self.connect_error());
        }
        self.commands.push(command.to_string());

        if self.failures.iter().any(|f| f == command) {
            return Err(tmsh::Error::CommandFailed {
                command: command.to_string(),
                code: Some(1),
                stdout: String::new(),
                stderr: "01020036:3: The requested object was not found.".to_string(),
            });
        }
        let stdout = self.responses.get(command).cloned().unwrap_or_default();
        Ok(CommandOutput::success_with(stdout))
    }

    fn put(&mut self, local: &Path, remote: &str) -> tmsh::Result<()> {
        if self.disconnected {
            return Err(self.connect_error());
        }
        if self.fail_transfers {
            return Err(tmsh::Error::TransferFailed {
                local: local.to_path_buf(),
                remote: remote.to_string(),
                code: Some(1),
                stdout: String::new(),
                stderr: "scp: dest open: Permission denied".to_string(),
            });
        }

        let size = fs::metadata(local).map(|m| m.len()).unwrap_or_default();
        self.transfers.push(Transfer {
            local: local.to_path_buf(),
            remote: remote.to_string(),
            size,
        });
        Ok(())
    }
}
