//! Ordered task lists and their execution.

use std::io::Write;

use log::{debug, info};

use crate::error::Error;
use crate::operation::Operation;
use crate::task::Task;

/// Outcome of a successful [`Workflow::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Tasks whose operation ran (zero on a dry run)
    pub executed: usize,
    /// Whether this was a dry run
    pub dry_run: bool,
}

/// Tasks executed strictly in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow<O> {
    tasks: Vec<Task<O>>,
}

impl<O> Default for Workflow<O> {
    fn default() -> Self {
        Self { tasks: Vec::new() }
    }
}

impl<O> Workflow<O> {
    /// Create an empty workflow.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task.
    pub fn push(&mut self, task: Task<O>) {
        self.tasks.push(task);
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the workflow has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks in execution order.
    pub fn iter(&self) -> std::slice::Iter<'_, Task<O>> {
        self.tasks.iter()
    }

    /// Display names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.tasks.iter().map(Task::display_name).collect()
    }
}

impl<O: Operation> Workflow<O> {
    /// Execute every task in order.
    ///
    /// On a dry run nothing executes; each task instead writes
    /// `Would run task: <name>` to `out`. Otherwise the first failure stops
    /// the run and is returned with the failing task's position.
    pub fn run<W: Write + ?Sized>(
        &self,
        ctx: &mut O::Context,
        dry_run: bool,
        out: &mut W,
    ) -> Result<RunSummary, Error<O::Error>> {
        if dry_run {
            for task in &self.tasks {
                writeln!(out, "Would run task: {}", task.display_name()).map_err(Error::Output)?;
            }
            return Ok(RunSummary {
                executed: 0,
                dry_run: true,
            });
        }

        for (index, task) in self.tasks.iter().enumerate() {
            let name = task.display_name();
            info!("Running workflow step: {name}");
            task.execute(ctx).map_err(|source| Error::Task {
                index,
                name: name.to_string(),
                source,
            })?;
            debug!("Workflow step {} of {} done", index + 1, self.tasks.len());
        }

        Ok(RunSummary {
            executed: self.tasks.len(),
            dry_run: false,
        })
    }

    /// Revert the first `completed` tasks, last one first.
    ///
    /// [`run`](Self::run) never calls this; it is for orchestrators that
    /// want compensation after a failure. Stops at the first revert error.
    pub fn revert(&self, ctx: &mut O::Context, completed: usize) -> Result<(), Error<O::Error>> {
        let completed = completed.min(self.tasks.len());
        for (index, task) in self.tasks[..completed].iter().enumerate().rev() {
            if task.revert_op().is_none() {
                continue;
            }
            info!("Reverting workflow step: {}", task.display_name());
            task.revert(ctx).map_err(|source| Error::Task {
                index,
                name: task.display_name().to_string(),
                source,
            })?;
        }
        Ok(())
    }
}

impl<O> FromIterator<Task<O>> for Workflow<O> {
    fn from_iter<I: IntoIterator<Item = Task<O>>>(iter: I) -> Self {
        Self {
            tasks: iter.into_iter().collect(),
        }
    }
}

impl<O> Extend<Task<O>> for Workflow<O> {
    fn extend<I: IntoIterator<Item = Task<O>>>(&mut self, iter: I) {
        self.tasks.extend(iter);
    }
}

impl<'a, O> IntoIterator for &'a Workflow<O> {
    type Item = &'a Task<O>;
    type IntoIter = std::slice::Iter<'a, Task<O>>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}
