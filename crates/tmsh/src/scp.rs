//! Secure-copy protocol negotiation.
//!
//! openssh-client 9.0 and later default `scp` to SFTP, which the BIG-IP does
//! not serve. Those clients accept `-O` to force the original SCP protocol;
//! older clients reject `-O` because they only ever spoke SCP. We cannot ask
//! the binary which kind it is, so we try `-O` first (it fails fast when
//! unsupported) and retry without it.

use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::runner::ProcessRunner;

/// Flag that forces the legacy SCP protocol on newer OpenSSH clients.
pub const LEGACY_PROTOCOL_FLAG: &str = "-O";

/// Invokes an external `scp` binary with protocol fallback.
#[derive(Debug, Clone)]
pub struct ScpClient {
    program: String,
    options: Vec<String>,
}

impl Default for ScpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScpClient {
    /// Client for the `scp` found in PATH.
    pub fn new() -> Self {
        Self {
            program: "scp".to_string(),
            options: Vec::new(),
        }
    }

    /// Use a different scp binary.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Add an ssh option, passed as `-o <option>`.
    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }

    /// Add several ssh options.
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extend(options.into_iter().map(Into::into));
        self
    }

    /// Copy `local` to `host:remote`.
    ///
    /// The first attempt passes [`LEGACY_PROTOCOL_FLAG`]. Any non-zero exit
    /// from it is taken to mean the flag is unsupported and the transfer is
    /// retried once without it. Only a failure of that second attempt is an
    /// error. A program that cannot be started at all fails immediately.
    pub fn copy(
        &self,
        runner: &dyn ProcessRunner,
        host: &str,
        local: &Path,
        remote: &str,
    ) -> Result<()> {
        let destination = format!("{host}:{remote}");

        let args = self.args(true, local, &destination);
        debug!("Trying `scp` with `-O` option to force SCP instead of SFTP...");
        debug!("`{} {}`", self.program, args.join(" "));
        if runner.run(&self.program, &args)?.success() {
            return Ok(());
        }

        debug!(
            "The available version of `scp` appears not to support the `-O` option, falling back..."
        );
        let args = self.args(false, local, &destination);
        debug!("`{} {}`", self.program, args.join(" "));
        let output = runner.run(&self.program, &args)?;
        if output.success() {
            return Ok(());
        }

        Err(Error::TransferFailed {
            local: local.to_path_buf(),
            remote: remote.to_string(),
            code: output.code,
            stdout: output.stdout_str(),
            stderr: output.stderr_str(),
        })
    }

    fn args(&self, legacy: bool, local: &Path, destination: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(self.options.len() * 2 + 3);
        if legacy {
            args.push(LEGACY_PROTOCOL_FLAG.to_string());
        }
        for option in &self.options {
            args.push("-o".to_string());
            args.push(option.clone());
        }
        args.push(local.to_string_lossy().to_string());
        args.push(destination.to_string());
        args
    }
}
