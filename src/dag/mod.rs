// src/dag/mod.rs

//! Subtask model and dependency graph.
//!
//! - [`subtask`] defines the immutable [`Subtask`] record and its [`Action`].
//! - [`spec`] holds the caller-facing [`TaskSpec`] handed to a decomposer.
//! - [`graph`] validates a decomposed subtask list and keeps the adjacency
//!   used for readiness checks.

pub mod graph;
pub mod spec;
pub mod subtask;

pub use graph::TaskGraph;
pub use spec::{Step, TaskSpec};
pub use subtask::{Action, Subtask, SubtaskId};
