//! Channel abstraction for appliance sessions.
//!
//! The [`Channel`] trait is the only thing the deployment steps see, so they
//! can be driven by a real [`ssh::SshChannel`] or by a test double.

pub mod ssh;

use std::path::Path;

use crate::error::Result;
use crate::types::CommandOutput;

/// A session with one appliance.
///
/// Implementations open their transport on first use and keep it for their
/// whole lifetime. Methods take `&mut self` because opening the transport
/// mutates the session.
pub trait Channel {
    /// The ssh destination this channel talks to.
    fn host(&self) -> &str;

    /// Run one command in the management shell.
    ///
    /// Returns [`Error::CommandFailed`](crate::Error::CommandFailed) when the
    /// shell exits non-zero.
    fn run(&mut self, command: &str) -> Result<CommandOutput>;

    /// Copy a local file to `remote` using the legacy scp protocol.
    fn put(&mut self, local: &Path, remote: &str) -> Result<()>;
}
