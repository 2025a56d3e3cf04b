//! Workflow run errors.

use std::io;
use thiserror::Error;

/// Why a workflow run stopped.
#[derive(Debug, Error)]
pub enum Error<E: std::error::Error + 'static> {
    /// A task's operation failed; later tasks were not run
    #[error("workflow step {} (`{name}`) failed", .index + 1)]
    Task {
        /// Zero-based position of the failing task
        index: usize,
        /// Display name of the failing task
        name: String,
        /// The operation's own error
        #[source]
        source: E,
    },

    /// Dry-run output could not be written
    #[error("failed to write dry-run output: {0}")]
    Output(#[source] io::Error),
}

impl<E: std::error::Error + 'static> Error<E> {
    /// Number of tasks that completed before the failure.
    pub fn completed(&self) -> usize {
        match self {
            Error::Task { index, .. } => *index,
            Error::Output(_) => 0,
        }
    }

    /// The failing operation's error, if a task failed.
    pub fn task_error(&self) -> Option<&E> {
        match self {
            Error::Task { source, .. } => Some(source),
            Error::Output(_) => None,
        }
    }
}
