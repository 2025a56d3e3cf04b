//! # tmsh
//!
//! Drive a BIG-IP appliance's `tmsh` management shell over OpenSSH.
//!
//! This crate provides:
//! - A [`Channel`] abstraction: run one tmsh command, or put one file on the appliance
//! - [`SshChannel`], which multiplexes every command and transfer over a single
//!   lazily opened OpenSSH control master
//! - [`ScpClient`], which negotiates the legacy scp protocol with whatever `scp`
//!   binary is installed locally
//!
//! ## Why legacy scp?
//!
//! OpenSSH 9.0 switched `scp` to the SFTP protocol by default. The BIG-IP only
//! accepts the original SCP protocol, which newer clients still speak when
//! given `-O`. Older clients reject `-O` outright, so [`ScpClient`] tries with
//! the flag first and falls back to a plain invocation.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use tmsh::{Channel, SshChannel};
//!
//! let mut channel = SshChannel::new("admin@bigip.example.com");
//!
//! // Nothing is opened until the first command or transfer
//! let local = Path::new("/etc/letsencrypt/live/example.com/fullchain.pem");
//! channel.put(local, "/var/tmp/fullchain.pem").expect("transfer failed");
//!
//! let output = channel.run("show /cm sync-status").expect("command failed");
//! println!("{}", output.stdout_str());
//! ```
//!
//! ## Testing
//!
//! Every external program goes through the [`ProcessRunner`] trait. Build an
//! [`SshChannel`] with [`SshChannel::with_runner`] to substitute a fake.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod error;
pub mod runner;
pub mod scp;
pub mod types;

pub use channel::Channel;
pub use channel::ssh::SshChannel;
pub use error::{Error, Result};
pub use runner::{ProcessRunner, SystemRunner};
pub use scp::ScpClient;
pub use types::CommandOutput;
