//! OpenSSH channel implementation.
//!
//! The first command or transfer starts an OpenSSH control master:
//!
//! ```text
//! ssh -M -N -f -S <socket> -o ControlPersist=<secs> <host>
//! ```
//!
//! Every later `ssh` and `scp` call multiplexes over that socket with
//! `-o ControlPath=<socket>`, so authentication happens exactly once per run.
//! The socket lives in a private temporary directory owned by the channel.

use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::TempDir;

use crate::channel::Channel;
use crate::error::{Error, Result};
use crate::runner::{ProcessRunner, SystemRunner};
use crate::scp::ScpClient;
use crate::types::CommandOutput;

/// Idle seconds before a forgotten control master exits on its own.
const DEFAULT_CONTROL_PERSIST_SECS: u64 = 60;

/// An open control master.
struct ControlMaster {
    socket: PathBuf,
    _dir: TempDir,
}

/// Channel backed by the system `ssh` and `scp` binaries.
pub struct SshChannel<R: ProcessRunner = SystemRunner> {
    host: String,
    options: Vec<String>,
    ssh_program: String,
    scp_program: String,
    persist_secs: u64,
    runner: R,
    master: Option<ControlMaster>,
}

impl SshChannel<SystemRunner> {
    /// Create a channel for `host` (anything ssh accepts as a destination).
    ///
    /// No connection is made until the channel is first used.
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_runner(host, SystemRunner)
    }
}

impl<R: ProcessRunner> SshChannel<R> {
    /// Create a channel that starts processes through `runner`.
    pub fn with_runner(host: impl Into<String>, runner: R) -> Self {
        Self {
            host: host.into(),
            options: Vec::new(),
            ssh_program: "ssh".to_string(),
            scp_program: "scp".to_string(),
            persist_secs: DEFAULT_CONTROL_PERSIST_SECS,
            runner,
            master: None,
        }
    }

    /// Add ssh options, each passed as `-o <option>` to both ssh and scp.
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extend(options.into_iter().map(Into::into));
        self
    }

    /// Override how long an idle control master lingers.
    pub fn with_control_persist(mut self, secs: u64) -> Self {
        self.persist_secs = secs;
        self
    }

    /// Whether the control master has been started.
    pub fn is_open(&self) -> bool {
        self.master.is_some()
    }

    /// Start the control master unless it is already running.
    ///
    /// Returns the control socket path.
    pub fn ensure_open(&mut self) -> Result<PathBuf> {
        if let Some(master) = &self.master {
            return Ok(master.socket.clone());
        }

        let dir = tempfile::Builder::new().prefix("bigip-ssh-").tempdir()?;
        let socket = dir.path().join("control");

        let mut args = self.option_args();
        args.extend([
            "-M".to_string(),
            "-N".to_string(),
            "-f".to_string(),
            "-S".to_string(),
            socket.to_string_lossy().to_string(),
            "-o".to_string(),
            format!("ControlPersist={}", self.persist_secs),
            self.host.clone(),
        ]);
        debug!("Opening ssh session to {}", self.host);
        debug!("`{} {}`", self.ssh_program, args.join(" "));

        let output = self.runner.run_detached(&self.ssh_program, &args)?;
        if !output.success() {
            return Err(Error::ConnectFailed {
                host: self.host.clone(),
                code: output.code,
                stderr: output.stderr_str(),
            });
        }

        self.master = Some(ControlMaster {
            socket: socket.clone(),
            _dir: dir,
        });
        Ok(socket)
    }

    fn option_args(&self) -> Vec<String> {
        self.options
            .iter()
            .flat_map(|option| ["-o".to_string(), option.clone()])
            .collect()
    }
}

impl<R: ProcessRunner> Channel for SshChannel<R> {
    fn host(&self) -> &str {
        &self.host
    }

    fn run(&mut self, command: &str) -> Result<CommandOutput> {
        let socket = self.ensure_open()?;

        let mut args = self.option_args();
        args.extend([
            "-o".to_string(),
            format!("ControlPath={}", socket.display()),
            self.host.clone(),
            command.to_string(),
        ]);

        let output = self.runner.run(&self.ssh_program, &args)?;
        if output.success() {
            Ok(output)
        } else {
            Err(Error::CommandFailed {
                command: command.to_string(),
                code: output.code,
                stdout: output.stdout_str(),
                stderr: output.stderr_str(),
            })
        }
    }

    fn put(&mut self, local: &Path, remote: &str) -> Result<()> {
        let socket = self.ensure_open()?;

        ScpClient::new()
            .with_program(self.scp_program.clone())
            .with_options(self.options.iter().cloned())
            .with_option(format!("ControlPath={}", socket.display()))
            .copy(&self.runner, &self.host, local, remote)
    }
}

impl<R: ProcessRunner> Drop for SshChannel<R> {
    fn drop(&mut self) {
        let Some(master) = self.master.take() else {
            return;
        };

        let args = vec![
            "-S".to_string(),
            master.socket.to_string_lossy().to_string(),
            "-O".to_string(),
            "exit".to_string(),
            self.host.clone(),
        ];
        match self.runner.run(&self.ssh_program, &args) {
            Ok(output) if output.success() => debug!("Closed ssh session to {}", self.host),
            Ok(output) => warn!(
                "Could not stop ssh control master for {}: {}",
                self.host,
                output.stderr_str().trim()
            ),
            Err(e) => warn!("Could not stop ssh control master for {}: {e}", self.host),
        }
    }
}
