//! Process execution seam.
//!
//! `ssh` and `scp` are always started through [`ProcessRunner`] so that the
//! channel and the scp negotiator can be exercised without a network.

use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use log::trace;

use crate::error::{Error, Result};
use crate::types::CommandOutput;

/// Runs an external program to completion and captures its output.
///
/// Implementations must return `Ok` for any process that actually ran,
/// whatever its exit status. `Err` is reserved for programs that could not be
/// started at all.
pub trait ProcessRunner: Send + Sync {
    /// Run `program` with `args` and wait for it.
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;

    /// Run a program that forks into the background (`ssh -f`) and wait only
    /// for the foreground process to exit.
    ///
    /// stdout is discarded and nothing is read from a pipe, since the
    /// background child may keep inherited descriptors open for its whole
    /// lifetime. Only the exit code and stderr are reported.
    fn run_detached(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        self.run(program, args)
    }
}

fn resolve(program: &str) -> Result<PathBuf> {
    which::which(program).map_err(|_| Error::ProgramNotFound {
        program: program.to_string(),
    })
}

/// Runner that spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let path = resolve(program)?;
        trace!("exec {} {}", path.display(), args.join(" "));

        let output = Command::new(&path)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| Error::Spawn {
                program: program.to_string(),
                source,
            })?;

        Ok(output.into())
    }

    fn run_detached(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let path = resolve(program)?;
        trace!("exec detached {} {}", path.display(), args.join(" "));

        let mut stderr = tempfile::tempfile()?;
        let status = Command::new(&path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(stderr.try_clone()?)
            .status()
            .map_err(|source| Error::Spawn {
                program: program.to_string(),
                source,
            })?;

        let mut captured = Vec::new();
        stderr.seek(SeekFrom::Start(0))?;
        stderr.read_to_end(&mut captured)?;

        Ok(CommandOutput {
            stdout: Vec::new(),
            stderr: captured,
            code: status.code(),
        })
    }
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        (**self).run(program, args)
    }

    fn run_detached(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        (**self).run_detached(program, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_missing_program() {
        let err = SystemRunner
            .run("definitely-not-a-real-program-bigip", &[])
            .unwrap_err();
        assert!(matches!(err, Error::ProgramNotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_exit_status() {
        let ok = SystemRunner.run("true", &[]).unwrap();
        assert!(ok.success());

        let failed = SystemRunner.run("false", &[]).unwrap();
        assert!(!failed.success());
        assert_eq!(failed.code, Some(1));
    }

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[cfg(unix)]
    #[test]
    fn test_detached_returns_when_parent_exits() {
        let started = Instant::now();
        let output = SystemRunner
            .run_detached("sh", &sh("( sleep 5 ) & exit 0"))
            .unwrap();

        assert!(output.success());
        assert!(
            started.elapsed() < Duration::from_secs(2),
            "waited {:?} for a background child",
            started.elapsed()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_detached_captures_stderr_and_code() {
        let output = SystemRunner
            .run_detached("sh", &sh("echo out; echo 'Permission denied' >&2; exit 255"))
            .unwrap();

        assert_eq!(output.code, Some(255));
        assert!(output.stdout.is_empty());
        assert_eq!(output.stderr_str(), "Permission denied\n");
    }
}
