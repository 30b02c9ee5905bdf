// src/engine/dispatch.rs

//! Shared state behind a [`crate::engine::Scheduler`] and its workers.
//!
//! Lock order is always registry first, then queue. Workers pop from the
//! queue without holding the registry lock and only take it afterwards to
//! claim the item, so the two never nest the other way round.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::{debug, trace};

use crate::config::SchedulerConfig;
use crate::dag::{Action, SubtaskId, TaskSpec};
use crate::engine::TaskId;
use crate::engine::ids::TaskIdGenerator;
use crate::engine::queue::{QueueItem, ReadyQueue};
use crate::engine::registry::{ResultEntry, TaskRecord};
use crate::engine::status::{StatusTracker, StatusView};
use crate::errors::{Result, TaskdagError};
use crate::exec::Executor;

/// Task registry guarded by [`DispatchCore`].
#[derive(Debug, Default)]
pub(crate) struct Registry {
    pub tasks: HashMap<TaskId, TaskRecord>,
    ids: TaskIdGenerator,
}

impl Registry {
    /// Fresh id not currently present in the registry.
    pub fn next_task_id(&mut self, spec: &TaskSpec) -> TaskId {
        loop {
            let id = self.ids.next_id(spec);
            if !self.tasks.contains_key(&id) {
                return id;
            }
        }
    }

    pub fn get_mut(&mut self, task_id: &str) -> Result<&mut TaskRecord> {
        self.tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskdagError::TaskNotFound(task_id.to_string()))
    }
}

pub(crate) struct DispatchCore {
    registry: Mutex<Registry>,
    pub queue: ReadyQueue,
    executor: Arc<dyn Executor>,
    config: SchedulerConfig,
    /// Signalled after every result write, claim release or cancellation.
    progress: Notify,
}

impl DispatchCore {
    pub fn new(config: SchedulerConfig, executor: Arc<dyn Executor>) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            queue: ReadyQueue::new(),
            executor,
            config,
            progress: Notify::new(),
        }
    }

    pub fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn executor(&self) -> Arc<dyn Executor> {
        Arc::clone(&self.executor)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Push subtasks already marked queued on `record`.
    ///
    /// Must be called with the registry lock held. Items the queue refuses
    /// (it has been closed) are put back to waiting. Returns how many were
    /// actually queued.
    pub fn enqueue(&self, record: &mut TaskRecord, ready: Vec<SubtaskId>) -> usize {
        let mut queued = 0;
        for subtask_id in ready {
            if self.queue.push(QueueItem::new(record.id.clone(), subtask_id.clone())) {
                queued += 1;
            } else {
                record.release(&subtask_id);
            }
        }
        queued
    }

    /// Turn a popped item into an action to run, or `None` if it must be
    /// dropped (task cancelled or evicted meanwhile).
    pub fn claim(&self, item: &QueueItem) -> Option<Action> {
        let action = {
            let mut registry = self.registry();
            let record = registry.tasks.get_mut(&item.task_id)?;
            record.claim(&item.subtask_id)
        };

        if action.is_none() {
            self.notify_progress();
        }
        action
    }

    /// Record the outcome of a claimed item and enqueue whatever it unblocked.
    pub fn complete(&self, item: &QueueItem, entry: ResultEntry) {
        {
            let mut registry = self.registry();
            if let Some(record) = registry.tasks.get_mut(&item.task_id) {
                let success = entry.is_success();
                if record.record_outcome(&item.subtask_id, entry) && success {
                    let ready = record.ready_dependents(&item.subtask_id);
                    if !ready.is_empty() {
                        trace!(
                            task_id = %item.task_id,
                            subtask = %item.subtask_id,
                            unblocked = ?ready,
                            "dependents became ready"
                        );
                    }
                    self.enqueue(record, ready);
                }
                record.maybe_complete();
            } else {
                debug!(task_id = %item.task_id, "result for evicted task dropped");
            }
        }

        self.notify_progress();
    }

    pub fn notify_progress(&self) {
        self.progress.notify_waiters();
    }

    /// Resolve once `task_id` has nothing queued or running.
    ///
    /// A task that was never executed resolves immediately.
    pub async fn wait_quiescent(&self, task_id: &str) -> Result<StatusView> {
        loop {
            let notified = self.progress.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(view) = self.quiescent_status(task_id)? {
                return Ok(view);
            }

            notified.await;
        }
    }

    fn quiescent_status(&self, task_id: &str) -> Result<Option<StatusView>> {
        let mut registry = self.registry();
        let record = registry.get_mut(task_id)?;
        if record.is_quiescent() {
            Ok(Some(StatusTracker::status(record)))
        } else {
            Ok(None)
        }
    }
}
