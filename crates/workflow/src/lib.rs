//! # Workflow
//!
//! Ordered, strictly sequential task lists.
//!
//! ## Core Concepts
//!
//! - **Operation**: a closed set of things that can be done, usually an enum
//!   whose variants carry their own payload
//! - **Task**: an optional name, the operation to execute and an optional
//!   compensating operation
//! - **Workflow**: tasks in execution order. Later tasks may assume earlier
//!   ones succeeded, so nothing is reordered or parallelised
//!
//! Because operations are plain values, two workflows built from the same
//! configuration compare equal, which makes workflow construction testable
//! without executing anything.
//!
//! ## Example
//!
//! ```
//! use std::convert::Infallible;
//! use workflow::{Operation, Task, Workflow};
//!
//! #[derive(Debug, PartialEq)]
//! enum Step {
//!     Push(u32),
//! }
//!
//! impl Operation for Step {
//!     type Context = Vec<u32>;
//!     type Error = Infallible;
//!
//!     fn run(&self, ctx: &mut Vec<u32>) -> Result<(), Infallible> {
//!         let Step::Push(n) = self;
//!         ctx.push(*n);
//!         Ok(())
//!     }
//! }
//!
//! let workflow: Workflow<Step> = [
//!     Task::named("first", Step::Push(1)),
//!     Task::named("second", Step::Push(2)),
//! ]
//! .into_iter()
//! .collect();
//!
//! let mut seen = Vec::new();
//! let summary = workflow.run(&mut seen, false, &mut std::io::sink()).unwrap();
//! assert_eq!(seen, vec![1, 2]);
//! assert_eq!(summary.executed, 2);
//! ```
//!
//! ## Failure and revert
//!
//! The first failing task stops the run; nothing is rolled back
//! automatically. [`Error::completed`] tells an orchestrator how many tasks
//! ran, and [`Workflow::revert`] walks them backwards if it chooses to.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod operation;
pub mod task;
pub mod workflow;

pub use error::Error;
pub use operation::Operation;
pub use task::Task;
pub use workflow::{RunSummary, Workflow};
