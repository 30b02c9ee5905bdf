// src/engine/queue.rs

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::Notify;
use tracing::{debug, trace};

use crate::dag::SubtaskId;
use crate::engine::TaskId;

/// A ready subtask waiting for a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub task_id: TaskId,
    pub subtask_id: SubtaskId,
    pub queued_time: Instant,
}

impl QueueItem {
    pub fn new(task_id: impl Into<TaskId>, subtask_id: impl Into<SubtaskId>) -> Self {
        Self {
            task_id: task_id.into(),
            subtask_id: subtask_id.into(),
            queued_time: Instant::now(),
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<QueueItem>,
    closed: bool,
}

/// FIFO of ready subtasks shared by every task of one scheduler.
///
/// Push, pop and [`ReadyQueue::purge_task`] all run under the same mutex, so
/// a purge can never race a worker for the same item: the worker either
/// popped it before the purge or will never see it.
///
/// Waiting workers park on a [`Notify`] instead of polling.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    state: Mutex<QueueState>,
    available: Notify,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an item. Returns `false` (and drops the item) once closed.
    pub fn push(&self, item: QueueItem) -> bool {
        {
            let mut state = self.lock();
            if state.closed {
                debug!(
                    task_id = %item.task_id,
                    subtask = %item.subtask_id,
                    "ready queue closed; dropping item"
                );
                return false;
            }
            trace!(task_id = %item.task_id, subtask = %item.subtask_id, "enqueued");
            state.items.push_back(item);
        }
        self.available.notify_one();
        true
    }

    /// Pop the oldest item without waiting.
    pub fn try_pop(&self) -> Option<QueueItem> {
        let mut state = self.lock();
        if state.closed {
            return None;
        }
        state.items.pop_front()
    }

    /// Wait for the next item.
    ///
    /// Returns `None` once the queue is closed.
    pub async fn pop(&self) -> Option<QueueItem> {
        loop {
            // Register interest before checking, so a push between the check
            // and the await is not lost.
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.closed {
                    return None;
                }
                if let Some(item) = state.items.pop_front() {
                    return Some(item);
                }
            }

            notified.await;
        }
    }

    /// Remove every not-yet-popped item belonging to `task_id`.
    pub fn purge_task(&self, task_id: &str) -> Vec<QueueItem> {
        let mut state = self.lock();
        let (purged, kept): (VecDeque<_>, VecDeque<_>) = state
            .items
            .drain(..)
            .partition(|item| item.task_id == task_id);
        state.items = kept;

        debug!(task_id, purged = purged.len(), "purged queued items");
        purged.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Close the queue, wake every waiting worker and hand back the items
    /// that were still queued.
    pub fn close(&self) -> Vec<QueueItem> {
        let drained: Vec<QueueItem> = {
            let mut state = self.lock();
            state.closed = true;
            state.items.drain(..).collect()
        };
        self.available.notify_waiters();

        debug!(drained = drained.len(), "ready queue closed");
        drained
    }
}
