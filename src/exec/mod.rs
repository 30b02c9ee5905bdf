// src/exec/mod.rs

//! Pluggable seams between the scheduler and the outside world.
//!
//! - [`backend`] defines the [`Executor`] trait that runs one subtask action,
//!   plus a [`SimulatedExecutor`] that only reports what it would have done.
//! - [`decompose`] defines the [`Decomposer`] trait that turns a task spec
//!   into subtasks, plus the built-in [`StepDecomposer`].
//!
//! Tests swap in their own implementations of either trait.

use std::future::Future;
use std::pin::Pin;

pub mod backend;
pub mod decompose;

pub use backend::{Executor, SimulatedExecutor};
pub use decompose::{Decomposer, FixedDecomposer, StepDecomposer};

/// Opaque value produced by a successful subtask.
pub type Payload = serde_json::Value;

/// Future returned by [`Executor::run`].
pub type ExecFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<Payload>> + Send + 'a>>;
