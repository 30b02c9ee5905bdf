// src/lib.rs

//! Dependency-aware task scheduler.
//!
//! A task is decomposed into a DAG of subtasks, ready subtasks are dispatched
//! to a bounded pool of workers, and progress and partial failure are tracked
//! per task. See [`engine::Scheduler`] for the entry point.

pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

pub use crate::config::SchedulerConfig;
pub use crate::dag::{Action, Step, Subtask, SubtaskId, TaskGraph, TaskSpec};
pub use crate::engine::{
    CancelAck, ExecuteAck, FailureKind, ResultEntry, ResultsReport, ResultsView, Scheduler,
    StatusView, SubtaskFailure, TaskId,
};
pub use crate::errors::{DecompositionError, Result, TaskdagError};
pub use crate::exec::{Decomposer, Executor, Payload, SimulatedExecutor, StepDecomposer};
pub use crate::types::{LogLevel, TaskStatus};

/// Load a scheduler config and a task spec from TOML, run the task to
/// quiescence and return its final status.
///
/// The scheduler is shut down before returning.
pub async fn run_from_files(
    config_path: impl AsRef<Path>,
    spec_path: impl AsRef<Path>,
    executor: Arc<dyn Executor>,
) -> Result<StatusView> {
    let config = config::load_and_validate(config_path)?;
    let spec = config::load_task_spec(spec_path)?;

    info!(
        task = %spec.name,
        workers = config.max_parallel_tasks,
        "running task from files"
    );

    let mut scheduler = Scheduler::with_executor(config, executor);
    let outcome = run_to_idle(&scheduler, &spec).await;
    scheduler.shutdown().await;
    outcome
}

async fn run_to_idle(scheduler: &Scheduler, spec: &TaskSpec) -> Result<StatusView> {
    let task_id = scheduler.submit(spec)?;
    scheduler.execute(&task_id)?;
    scheduler.wait_idle(&task_id).await
}
