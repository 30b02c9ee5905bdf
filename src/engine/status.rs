// src/engine/status.rs

//! Progress and result views derived from a task record.
//!
//! The views are snapshots; they never hold references into the registry.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::dag::SubtaskId;
use crate::engine::registry::{ResultEntry, TaskRecord};
use crate::engine::TaskId;
use crate::types::TaskStatus;

/// Snapshot returned by [`crate::engine::Scheduler::status`].
#[derive(Debug, Clone, PartialEq)]
pub struct StatusView {
    pub task_id: TaskId,
    pub status: TaskStatus,
    /// `completed_subtasks / total_subtasks`, or 0 for an empty task.
    pub progress: f64,
    /// Subtasks with a `Success` entry.
    pub completed_subtasks: usize,
    pub total_subtasks: usize,
    /// Subtasks with a `Failure` entry, in decomposition order.
    pub failed_subtasks: Vec<SubtaskId>,
    /// Pending subtasks that will never run because an ancestor failed.
    pub blocked_subtasks: Vec<SubtaskId>,
    pub start_time: SystemTime,
    pub end_time: Option<SystemTime>,
}

/// Full results of a completed task.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsView {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub execution_time: Duration,
    pub subtask_results: BTreeMap<SubtaskId, ResultEntry>,
    pub failed_subtasks: Vec<SubtaskId>,
}

/// Answer to [`crate::engine::Scheduler::results`].
///
/// `Pending` is not an error: the task simply is not `completed` yet, and
/// only its progress is reported.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultsReport {
    Ready(ResultsView),
    Pending {
        task_id: TaskId,
        status: TaskStatus,
        progress: f64,
    },
}

impl ResultsReport {
    pub fn is_ready(&self) -> bool {
        matches!(self, ResultsReport::Ready(_))
    }

    pub fn into_ready(self) -> Option<ResultsView> {
        match self {
            ResultsReport::Ready(view) => Some(view),
            ResultsReport::Pending { .. } => None,
        }
    }
}

/// Derives [`StatusView`] and [`ResultsReport`] from a [`TaskRecord`].
pub(crate) struct StatusTracker;

impl StatusTracker {
    /// Status snapshot.
    ///
    /// If every subtask succeeded while the task is still `Executing`, this
    /// flips it to `Completed` and stamps `end_time`. Later calls observe the
    /// terminal state and never re-stamp.
    pub fn status(record: &mut TaskRecord) -> StatusView {
        let progress = Self::progress(record);

        if progress >= 1.0 && record.maybe_complete() {
            debug!(task_id = %record.id, "status check observed full progress");
        }

        StatusView {
            task_id: record.id.clone(),
            status: record.status,
            progress,
            completed_subtasks: record.results.success_count(),
            total_subtasks: record.graph.len(),
            failed_subtasks: record.failed_subtasks(),
            blocked_subtasks: record.blocked_subtasks(),
            start_time: record.start_time,
            end_time: record.end_time,
        }
    }

    /// Results if `Completed`, otherwise a `Pending` report with progress.
    pub fn results(record: &TaskRecord) -> ResultsReport {
        if record.status != TaskStatus::Completed {
            return ResultsReport::Pending {
                task_id: record.id.clone(),
                status: record.status,
                progress: Self::progress(record),
            };
        }

        let execution_time = record
            .end_time
            .and_then(|end| end.duration_since(record.start_time).ok())
            .unwrap_or_default();

        let subtask_results = record
            .results
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect();

        ResultsReport::Ready(ResultsView {
            task_id: record.id.clone(),
            status: record.status,
            execution_time,
            subtask_results,
            failed_subtasks: record.failed_subtasks(),
        })
    }

    fn progress(record: &TaskRecord) -> f64 {
        let total = record.graph.len();
        if total == 0 {
            return 0.0;
        }
        record.results.success_count() as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dag::{Action, Subtask, TaskGraph};

    fn two_step_record() -> TaskRecord {
        let graph = TaskGraph::new(vec![
            Subtask::new("A", Action::new("a")),
            Subtask::new("B", Action::new("b")).after("A"),
        ])
        .unwrap();
        TaskRecord::new("task_status".into(), graph)
    }

    fn succeed(record: &mut TaskRecord, id: &str) {
        record.claim(id).unwrap();
        record.record_outcome(
            id,
            ResultEntry::Success {
                payload: json!(id),
                latency: Duration::ZERO,
            },
        );
        record.ready_dependents(id);
    }

    #[test]
    fn progress_counts_successes_only() {
        let mut rec = two_step_record();
        rec.begin_execution();
        succeed(&mut rec, "A");

        let view = StatusTracker::status(&mut rec);
        assert_eq!(view.status, TaskStatus::Executing);
        assert_eq!(view.completed_subtasks, 1);
        assert_eq!(view.total_subtasks, 2);
        assert!((view.progress - 0.5).abs() < f64::EPSILON);
        assert!(view.end_time.is_none());
    }

    #[test]
    fn results_are_pending_until_completed() {
        let mut rec = two_step_record();
        rec.begin_execution();

        match StatusTracker::results(&rec) {
            ResultsReport::Pending { status, progress, .. } => {
                assert_eq!(status, TaskStatus::Executing);
                assert_eq!(progress, 0.0);
            }
            other => panic!("expected pending, got {other:?}"),
        }

        succeed(&mut rec, "A");
        succeed(&mut rec, "B");

        let view = StatusTracker::status(&mut rec);
        assert_eq!(view.status, TaskStatus::Completed);
        let stamped = view.end_time;
        assert!(stamped.is_some());

        // Repeated calls see the same terminal state and timestamp.
        assert_eq!(StatusTracker::status(&mut rec).end_time, stamped);

        let results = StatusTracker::results(&rec).into_ready().unwrap();
        assert_eq!(results.subtask_results.len(), 2);
        assert!(results.failed_subtasks.is_empty());
        assert_eq!(results.subtask_results["B"].payload(), Some(&json!("B")));
    }

    #[test]
    fn empty_task_reports_zero_progress() {
        let mut rec = TaskRecord::new("task_empty".into(), TaskGraph::new(Vec::new()).unwrap());
        let view = StatusTracker::status(&mut rec);
        assert_eq!(view.progress, 0.0);
        assert_eq!(view.total_subtasks, 0);
    }
}
