// src/errors.rs

//! Crate-wide error types.
//!
//! Only [`TaskdagError::TaskNotFound`] and [`TaskdagError::Decomposition`]
//! come out of the scheduler's task operations in normal use. Subtask
//! failures are never errors here: they are recorded as data in the result
//! store (see [`crate::engine::ResultEntry`]).

use thiserror::Error;

use crate::dag::SubtaskId;
use crate::engine::TaskId;

/// Why a decomposed subtask list was rejected at `submit` time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecompositionError {
    /// The dependency relation contains a cycle. `cycle` lists the subtask
    /// ids along the cycle, starting and ending at the same id.
    #[error("cycle detected in subtask graph: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<SubtaskId> },

    #[error("subtask '{subtask}' has unknown dependency '{dependency}'")]
    InvalidDependency {
        subtask: SubtaskId,
        dependency: SubtaskId,
    },

    #[error("duplicate subtask id '{0}'")]
    DuplicateSubtask(SubtaskId),

    /// The external decomposer itself failed.
    #[error("decomposer failed: {0}")]
    Decomposer(String),
}

#[derive(Error, Debug)]
pub enum TaskdagError {
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Decomposition error: {0}")]
    Decomposition(#[from] DecompositionError),

    #[error("Task already completed: {0}")]
    AlreadyCompleted(TaskId),

    #[error("Task is still executing: {0}")]
    TaskStillExecuting(TaskId),

    #[error("Scheduler has been shut down")]
    SchedulerClosed,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskdagError>;
