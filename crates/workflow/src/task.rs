//! A single named unit of work.

use crate::operation::Operation;

/// Name shown for tasks built without one.
const UNNAMED: &str = "unnamed";

/// An operation to execute plus an optional compensating operation.
///
/// Equality compares only the operations, never the name: a task built
/// without a name equals the same task built with one.
#[derive(Debug, Clone)]
pub struct Task<O> {
    name: Option<String>,
    exec: O,
    revert: Option<O>,
}

impl<O> Task<O> {
    /// Create an unnamed task.
    pub fn new(exec: O) -> Self {
        Self {
            name: None,
            exec,
            revert: None,
        }
    }

    /// Create a task with a human-readable name.
    pub fn named(name: impl Into<String>, exec: O) -> Self {
        Self {
            name: Some(name.into()),
            exec,
            revert: None,
        }
    }

    /// Attach a compensating operation.
    pub fn with_revert(mut self, revert: O) -> Self {
        self.revert = Some(revert);
        self
    }

    /// The task's name, if it has one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name for display, falling back to a placeholder.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNNAMED)
    }

    /// The operation run by [`execute`](Self::execute).
    pub fn exec(&self) -> &O {
        &self.exec
    }

    /// The operation run by [`revert`](Self::revert), if any.
    pub fn revert_op(&self) -> Option<&O> {
        self.revert.as_ref()
    }
}

impl<O: Operation> Task<O> {
    /// Run the bound operation. Errors are returned untouched.
    pub fn execute(&self, ctx: &mut O::Context) -> Result<(), O::Error> {
        self.exec.run(ctx)
    }

    /// Run the compensating operation; a no-op when none was bound.
    pub fn revert(&self, ctx: &mut O::Context) -> Result<(), O::Error> {
        match &self.revert {
            Some(op) => op.run(ctx),
            None => Ok(()),
        }
    }
}

impl<O: PartialEq> PartialEq for Task<O> {
    fn eq(&self, other: &Self) -> bool {
        self.exec == other.exec && self.revert == other.revert
    }
}

impl<O: Eq> Eq for Task<O> {}
