// src/engine/scheduler.rs

//! Public scheduler facade.
//!
//! The scheduler owns the task registry, the ready queue and the worker pool.
//! Callers only see ids and snapshot views; nothing here hands out references
//! into the registry.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::dag::{SubtaskId, TaskGraph, TaskSpec};
use crate::engine::TaskId;
use crate::engine::dispatch::DispatchCore;
use crate::engine::registry::{ResultEntry, TaskRecord};
use crate::engine::status::{ResultsReport, StatusTracker, StatusView};
use crate::engine::worker::WorkerPool;
use crate::errors::{DecompositionError, Result, TaskdagError};
use crate::exec::{Decomposer, Executor, StepDecomposer};
use crate::types::TaskStatus;

/// Answer to [`Scheduler::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteAck {
    pub task_id: TaskId,
    pub status: TaskStatus,
    /// Subtasks enqueued by this call. Zero when the call was a no-op.
    pub queued: usize,
}

/// Answer to [`Scheduler::cancel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelAck {
    pub task_id: TaskId,
    /// Queued items removed before any worker claimed them.
    pub purged: usize,
    /// Subtasks already running; they finish and their results are kept.
    pub in_flight: usize,
}

/// Dependency-aware scheduler with a bounded worker pool.
///
/// Construction spawns the workers, so it must happen inside a tokio runtime.
/// Dropping the scheduler closes the queue and lets the workers wind down;
/// [`Scheduler::shutdown`] does the same and waits for them.
pub struct Scheduler {
    core: Arc<DispatchCore>,
    decomposer: Arc<dyn Decomposer>,
    pool: Option<WorkerPool>,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        decomposer: Arc<dyn Decomposer>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        let size = config.max_parallel_tasks.max(1);
        let core = Arc::new(DispatchCore::new(config, executor));
        let pool = WorkerPool::spawn(Arc::clone(&core), size);

        Self {
            core,
            decomposer,
            pool: Some(pool),
        }
    }

    /// Scheduler using the built-in [`StepDecomposer`].
    pub fn with_executor(config: SchedulerConfig, executor: Arc<dyn Executor>) -> Self {
        Self::new(config, Arc::new(StepDecomposer), executor)
    }

    pub fn config(&self) -> &SchedulerConfig {
        self.core.config()
    }

    /// Decompose `spec`, validate the graph and register the task.
    ///
    /// Nothing runs until [`Scheduler::execute`]. On error nothing is
    /// registered.
    pub fn submit(&self, spec: &TaskSpec) -> Result<TaskId> {
        let subtasks = self
            .decomposer
            .decompose(spec)
            .map_err(|e| DecompositionError::Decomposer(format!("{e:#}")))?;

        let graph = TaskGraph::new(subtasks).inspect_err(|e| {
            warn!(task = %spec.name, error = %e, "rejected task");
        })?;
        let total = graph.len();

        let task_id = {
            let mut registry = self.core.registry();
            let task_id = registry.next_task_id(spec);
            registry
                .tasks
                .insert(task_id.clone(), TaskRecord::new(task_id.clone(), graph));
            task_id
        };

        info!(task_id = %task_id, task = %spec.name, subtasks = total, "task submitted");
        Ok(task_id)
    }

    /// Start dispatching a submitted task.
    ///
    /// Calling this on a task that is already executing or terminal changes
    /// nothing and reports its current status.
    pub fn execute(&self, task_id: &str) -> Result<ExecuteAck> {
        let ack = {
            let mut registry = self.core.registry();
            let record = registry.get_mut(task_id)?;

            if record.status != TaskStatus::Decomposed {
                debug!(task_id, status = %record.status, "execute is a no-op");
                return Ok(ExecuteAck {
                    task_id: task_id.to_string(),
                    status: record.status,
                    queued: 0,
                });
            }

            if self.core.queue.is_closed() {
                return Err(TaskdagError::SchedulerClosed);
            }

            let ready = record.begin_execution();
            let queued = self.core.enqueue(record, ready);

            info!(task_id, queued, "task executing");
            ExecuteAck {
                task_id: task_id.to_string(),
                status: record.status,
                queued,
            }
        };

        self.core.notify_progress();
        Ok(ack)
    }

    /// Progress snapshot. May flip a fully successful task to `Completed`.
    pub fn status(&self, task_id: &str) -> Result<StatusView> {
        let mut registry = self.core.registry();
        let record = registry.get_mut(task_id)?;
        Ok(StatusTracker::status(record))
    }

    /// Results of a completed task, or its progress if it is not completed.
    pub fn results(&self, task_id: &str) -> Result<ResultsReport> {
        let mut registry = self.core.registry();
        let record = registry.get_mut(task_id)?;
        Ok(StatusTracker::results(record))
    }

    /// Cancel a task.
    ///
    /// Queued items are purged under the registry lock so no worker can
    /// claim them afterwards. Running subtasks finish; their results are
    /// recorded but unblock nothing. Cancelling twice is harmless.
    pub fn cancel(&self, task_id: &str) -> Result<CancelAck> {
        let ack = {
            let mut registry = self.core.registry();
            let record = registry.get_mut(task_id)?;

            match record.status {
                TaskStatus::Completed => {
                    return Err(TaskdagError::AlreadyCompleted(task_id.to_string()));
                }
                TaskStatus::Cancelled => CancelAck {
                    task_id: task_id.to_string(),
                    purged: 0,
                    in_flight: record.in_flight(),
                },
                TaskStatus::Decomposed | TaskStatus::Executing => {
                    let purged = self.core.queue.purge_task(task_id);
                    record.cancel(&purged);
                    CancelAck {
                        task_id: task_id.to_string(),
                        purged: purged.len(),
                        in_flight: record.in_flight(),
                    }
                }
            }
        };

        self.core.notify_progress();
        Ok(ack)
    }

    /// Current entry for one subtask, `None` if the task has no such subtask.
    pub fn entry(&self, task_id: &str, subtask_id: &str) -> Result<Option<ResultEntry>> {
        let mut registry = self.core.registry();
        let record = registry.get_mut(task_id)?;
        Ok(record.results.get(subtask_id).cloned())
    }

    /// Subtask ids of a task in decomposition order.
    pub fn subtask_ids(&self, task_id: &str) -> Result<Vec<SubtaskId>> {
        let mut registry = self.core.registry();
        let record = registry.get_mut(task_id)?;
        Ok(record.graph.subtasks().iter().map(|s| s.id.clone()).collect())
    }

    /// Drop a task from the registry and return its final status.
    ///
    /// Refused while any of its subtasks is queued or running.
    pub fn evict(&self, task_id: &str) -> Result<TaskStatus> {
        let mut registry = self.core.registry();
        let record = registry.get_mut(task_id)?;

        if !record.is_quiescent() {
            return Err(TaskdagError::TaskStillExecuting(task_id.to_string()));
        }

        let status = record.status;
        registry.tasks.remove(task_id);
        debug!(task_id, %status, "task evicted");
        Ok(status)
    }

    /// Ids of every registered task, sorted.
    pub fn task_ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self.core.registry().tasks.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Wait until `task_id` has nothing queued or running, then return its
    /// status.
    ///
    /// For a task blocked behind a failed subtask this resolves while the
    /// task is still `Executing`.
    pub async fn wait_idle(&self, task_id: &str) -> Result<StatusView> {
        self.core.wait_quiescent(task_id).await
    }

    /// Number of workers.
    pub fn pool_size(&self) -> usize {
        self.pool.as_ref().map(WorkerPool::size).unwrap_or(0)
    }

    /// Close the queue and wait for every worker to exit.
    ///
    /// Queued items are dropped and their subtasks go back to waiting, so
    /// their entries stay `Pending` and [`Scheduler::wait_idle`] and
    /// [`Scheduler::evict`] see the task as idle once running subtasks
    /// finish. Later calls to [`Scheduler::execute`] fail with
    /// [`TaskdagError::SchedulerClosed`].
    pub async fn shutdown(&mut self) {
        let released = {
            let mut registry = self.core.registry();
            let drained = self.core.queue.close();
            for item in &drained {
                if let Some(record) = registry.tasks.get_mut(&item.task_id) {
                    record.release(&item.subtask_id);
                }
            }
            drained.len()
        };
        self.core.notify_progress();

        if let Some(pool) = self.pool.take() {
            pool.join().await;
        }
        info!(released, "scheduler shut down");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.core.queue.close();
    }
}
