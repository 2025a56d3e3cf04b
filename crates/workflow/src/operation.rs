//! The unit of work a task binds.

use std::fmt;

/// Something a [`Task`](crate::Task) can execute or revert.
///
/// Implement this on a sum type with one variant per kind of step. The
/// context is passed explicitly on every call instead of being captured, so
/// tests can hand in a substitute.
pub trait Operation: fmt::Debug + PartialEq {
    /// State every operation needs, e.g. a remote session.
    type Context: ?Sized;

    /// Error returned by a failed operation.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Perform the operation.
    fn run(&self, ctx: &mut Self::Context) -> Result<(), Self::Error>;
}
