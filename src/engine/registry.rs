// src/engine/registry.rs

//! Per-task bookkeeping owned by the scheduler.
//!
//! A [`TaskRecord`] pairs a validated [`TaskGraph`] with:
//! - the task lifecycle status and timestamps,
//! - a [`ResultStore`] holding one [`ResultEntry`] per subtask,
//! - an internal dispatch state per subtask (waiting, queued, running,
//!   finished) used to make check-and-enqueue idempotent.
//!
//! Every method here assumes the caller holds the registry lock.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use crate::dag::{Action, SubtaskId, TaskGraph};
use crate::engine::queue::QueueItem;
use crate::engine::TaskId;
use crate::exec::Payload;
use crate::types::TaskStatus;

/// Outcome slot for one subtask.
///
/// Starts `Pending`; transitions to `Success` or `Failure` exactly once.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultEntry {
    Pending,
    Success { payload: Payload, latency: Duration },
    Failure(SubtaskFailure),
}

impl ResultEntry {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResultEntry::Pending)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResultEntry::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ResultEntry::Failure(_))
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            ResultEntry::Success { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&SubtaskFailure> {
        match self {
            ResultEntry::Failure(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Why a subtask failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The executor returned an error.
    Execution,
    /// The executor did not finish within the configured subtask timeout.
    Timeout,
    /// The executor panicked.
    Panicked,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Execution => "execution",
            FailureKind::Timeout => "timeout",
            FailureKind::Panicked => "panicked",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtaskFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl SubtaskFailure {
    pub fn execution(err: &anyhow::Error) -> Self {
        Self {
            kind: FailureKind::Execution,
            message: format!("{err:#}"),
        }
    }

    pub fn timeout(limit: Duration) -> Self {
        Self {
            kind: FailureKind::Timeout,
            message: format!("subtask exceeded timeout of {limit:?}"),
        }
    }

    pub fn panicked(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Panicked,
            message: message.into(),
        }
    }
}

impl fmt::Display for SubtaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Map from subtask id to outcome for one task.
#[derive(Debug, Clone)]
pub struct ResultStore {
    entries: HashMap<SubtaskId, ResultEntry>,
}

impl ResultStore {
    /// One `Pending` entry per subtask of `graph`.
    pub fn new(graph: &TaskGraph) -> Self {
        let entries = graph
            .subtasks()
            .iter()
            .map(|s| (s.id.clone(), ResultEntry::Pending))
            .collect();
        Self { entries }
    }

    pub fn get(&self, id: &str) -> Option<&ResultEntry> {
        self.entries.get(id)
    }

    /// Write a terminal entry.
    ///
    /// Only the `Pending -> terminal` transition is accepted; writing
    /// `Pending`, writing twice or writing an unknown id returns `false`
    /// and leaves the store untouched.
    pub fn record(&mut self, id: &str, entry: ResultEntry) -> bool {
        if !entry.is_terminal() {
            return false;
        }
        match self.entries.get_mut(id) {
            Some(slot) if !slot.is_terminal() => {
                *slot = entry;
                true
            }
            _ => false,
        }
    }

    pub fn is_success(&self, id: &str) -> bool {
        self.entries.get(id).is_some_and(ResultEntry::is_success)
    }

    pub fn success_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_success()).count()
    }

    pub fn all_success(&self) -> bool {
        self.entries.values().all(ResultEntry::is_success)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SubtaskId, &ResultEntry)> {
        self.entries.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DispatchState {
    /// Not yet ready, or ready but never enqueued.
    Waiting,
    /// Sitting in the ready queue (or popped but not yet claimed).
    Queued,
    /// Claimed by a worker; the executor call is in flight.
    Running,
    /// Result written.
    Finished,
}

/// Everything the scheduler knows about one submitted task.
#[derive(Debug)]
pub(crate) struct TaskRecord {
    pub id: TaskId,
    pub graph: TaskGraph,
    pub status: TaskStatus,
    pub start_time: SystemTime,
    pub end_time: Option<SystemTime>,
    pub results: ResultStore,
    dispatch: HashMap<SubtaskId, DispatchState>,
}

impl TaskRecord {
    pub fn new(id: TaskId, graph: TaskGraph) -> Self {
        let results = ResultStore::new(&graph);
        let dispatch = graph
            .subtasks()
            .iter()
            .map(|s| (s.id.clone(), DispatchState::Waiting))
            .collect();

        Self {
            id,
            graph,
            status: TaskStatus::Decomposed,
            start_time: SystemTime::now(),
            end_time: None,
            results,
            dispatch,
        }
    }

    /// Move `Decomposed -> Executing` and return the initial ready set,
    /// already marked queued.
    ///
    /// A task with no subtasks completes immediately.
    pub fn begin_execution(&mut self) -> Vec<SubtaskId> {
        self.status = TaskStatus::Executing;

        if self.graph.is_empty() {
            self.mark_completed();
            return Vec::new();
        }

        let roots: Vec<SubtaskId> = self.graph.roots().map(|s| s.id.clone()).collect();
        roots
            .into_iter()
            .filter(|id| self.try_mark_queued(id))
            .collect()
    }

    /// After `completed` succeeded, mark and return its dependents that
    /// became ready.
    pub fn ready_dependents(&mut self, completed: &str) -> Vec<SubtaskId> {
        if self.status != TaskStatus::Executing {
            return Vec::new();
        }

        let dependents = self.graph.dependents_of(completed).to_vec();
        dependents
            .into_iter()
            .filter(|id| self.try_mark_queued(id))
            .collect()
    }

    /// Check-and-mark in one step: a subtask is queued at most once.
    fn try_mark_queued(&mut self, id: &str) -> bool {
        if self.dispatch.get(id) != Some(&DispatchState::Waiting) || !self.deps_satisfied(id) {
            return false;
        }
        self.dispatch.insert(id.to_string(), DispatchState::Queued);
        true
    }

    /// Every dependency has a `Success` entry.
    pub fn deps_satisfied(&self, id: &str) -> bool {
        self.graph
            .dependencies_of(id)
            .all(|dep| self.results.is_success(dep))
    }

    /// Put a queued subtask back to waiting, e.g. when the queue refused it.
    pub fn release(&mut self, id: &str) {
        if let Some(state) = self.dispatch.get_mut(id) {
            if *state == DispatchState::Queued {
                *state = DispatchState::Waiting;
            }
        }
    }

    /// Hand a queued subtask to a worker.
    ///
    /// Returns `None` (and puts the subtask back to waiting) if the task is
    /// no longer executing, e.g. it was cancelled after the item was popped.
    pub fn claim(&mut self, id: &str) -> Option<Action> {
        if self.dispatch.get(id) != Some(&DispatchState::Queued) {
            warn!(task_id = %self.id, subtask = %id, "claim for subtask that is not queued");
            return None;
        }

        if self.status != TaskStatus::Executing {
            debug!(
                task_id = %self.id,
                subtask = %id,
                status = %self.status,
                "task no longer executing; dropping popped item"
            );
            self.dispatch.insert(id.to_string(), DispatchState::Waiting);
            return None;
        }

        let action = self.graph.get(id)?.action.clone();
        self.dispatch.insert(id.to_string(), DispatchState::Running);
        Some(action)
    }

    /// Store the outcome of a running subtask.
    pub fn record_outcome(&mut self, id: &str, entry: ResultEntry) -> bool {
        if self.dispatch.get(id) != Some(&DispatchState::Running) {
            warn!(task_id = %self.id, subtask = %id, "outcome for subtask that is not running; ignoring");
            return false;
        }
        self.dispatch.insert(id.to_string(), DispatchState::Finished);
        self.results.record(id, entry)
    }

    /// Flip `Executing -> Completed` if every subtask succeeded.
    ///
    /// Returns `true` only on the call that performed the transition.
    pub fn maybe_complete(&mut self) -> bool {
        if self.status == TaskStatus::Executing && self.results.all_success() {
            self.mark_completed();
            true
        } else {
            false
        }
    }

    fn mark_completed(&mut self) {
        self.status = TaskStatus::Completed;
        self.end_time = Some(SystemTime::now());
        info!(task_id = %self.id, subtasks = self.graph.len(), "task completed");
    }

    /// Cancel the task. `purged` are the queue items removed for it.
    pub fn cancel(&mut self, purged: &[QueueItem]) {
        for item in purged {
            self.release(&item.subtask_id);
        }

        self.status = TaskStatus::Cancelled;
        self.end_time = Some(SystemTime::now());

        info!(
            task_id = %self.id,
            purged = purged.len(),
            in_flight = self.in_flight(),
            "task cancelled"
        );
    }

    /// Subtasks currently claimed by a worker.
    pub fn in_flight(&self) -> usize {
        self.dispatch
            .values()
            .filter(|s| **s == DispatchState::Running)
            .count()
    }

    /// No subtask is queued or running.
    pub fn is_quiescent(&self) -> bool {
        !self
            .dispatch
            .values()
            .any(|s| matches!(s, DispatchState::Queued | DispatchState::Running))
    }

    /// Failed subtasks in decomposition order.
    pub fn failed_subtasks(&self) -> Vec<SubtaskId> {
        self.graph
            .subtasks()
            .iter()
            .filter(|s| self.results.get(&s.id).is_some_and(ResultEntry::is_failure))
            .map(|s| s.id.clone())
            .collect()
    }

    /// Pending subtasks that can never run because an ancestor failed, in
    /// decomposition order.
    pub fn blocked_subtasks(&self) -> Vec<SubtaskId> {
        let mut blocked: HashSet<&str> = HashSet::new();

        for failed in self.failed_subtasks() {
            for below in self.graph.descendants_of(&failed) {
                if matches!(self.results.get(below), Some(ResultEntry::Pending)) {
                    blocked.insert(below);
                }
            }
        }

        let mut ordered: Vec<&str> = blocked.into_iter().collect();
        ordered.sort_by_key(|id| self.graph.position(id));
        ordered.into_iter().map(str::to_string).collect()
    }
}
