// src/engine/worker.rs

//! Fixed-size pool of workers draining the shared ready queue.
//!
//! Each worker loops: pop an item, claim it, run the executor, record the
//! outcome. The executor call runs in its own tokio task so that a panic or
//! a timeout only affects that one subtask.

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::dag::Action;
use crate::engine::dispatch::DispatchCore;
use crate::engine::queue::QueueItem;
use crate::engine::registry::{ResultEntry, SubtaskFailure};

/// Handles of the spawned workers.
#[derive(Debug)]
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` workers onto the current tokio runtime.
    pub(crate) fn spawn(core: Arc<DispatchCore>, size: usize) -> Self {
        let workers = (0..size)
            .map(|worker| tokio::spawn(worker_loop(worker, Arc::clone(&core))))
            .collect();

        info!(workers = size, "worker pool started");
        Self { workers }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Wait for every worker to exit. Workers exit once the queue is closed.
    pub async fn join(self) {
        for handle in self.workers {
            if let Err(e) = handle.await {
                warn!(error = %e, "worker ended abnormally");
            }
        }
        debug!("worker pool stopped");
    }
}

async fn worker_loop(worker: usize, core: Arc<DispatchCore>) {
    debug!(worker, "worker started");

    while let Some(item) = core.queue.pop().await {
        let Some(action) = core.claim(&item) else {
            continue;
        };

        let entry = run_subtask(worker, &core, &item, action).await;
        core.complete(&item, entry);
    }

    debug!(worker, "worker exiting; queue closed");
}

/// Run one claimed subtask and turn whatever happens into a result entry.
async fn run_subtask(
    worker: usize,
    core: &DispatchCore,
    item: &QueueItem,
    action: Action,
) -> ResultEntry {
    debug!(
        worker,
        task_id = %item.task_id,
        subtask = %item.subtask_id,
        action = %action.kind,
        waited_ms = item.queued_time.elapsed().as_millis() as u64,
        "running subtask"
    );

    let executor = core.executor();
    let started = Instant::now();
    let mut handle = tokio::spawn(async move { executor.run(&action).await });

    let joined = match core.config().subtask_timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                handle.abort();
                warn!(
                    worker,
                    task_id = %item.task_id,
                    subtask = %item.subtask_id,
                    timeout = ?limit,
                    "subtask timed out"
                );
                return ResultEntry::Failure(SubtaskFailure::timeout(limit));
            }
        },
        None => handle.await,
    };

    let latency = started.elapsed();

    match joined {
        Ok(Ok(payload)) => {
            debug!(
                worker,
                task_id = %item.task_id,
                subtask = %item.subtask_id,
                latency_ms = latency.as_millis() as u64,
                "subtask succeeded"
            );
            ResultEntry::Success { payload, latency }
        }
        Ok(Err(err)) => {
            warn!(
                worker,
                task_id = %item.task_id,
                subtask = %item.subtask_id,
                error = %format!("{err:#}"),
                "subtask failed"
            );
            ResultEntry::Failure(SubtaskFailure::execution(&err))
        }
        Err(join_err) if join_err.is_panic() => {
            let message = panic_message(join_err.into_panic());
            error!(
                worker,
                task_id = %item.task_id,
                subtask = %item.subtask_id,
                panic = %message,
                "executor panicked"
            );
            ResultEntry::Failure(SubtaskFailure::panicked(message))
        }
        Err(join_err) => {
            warn!(
                worker,
                task_id = %item.task_id,
                subtask = %item.subtask_id,
                error = %join_err,
                "executor task was cancelled"
            );
            ResultEntry::Failure(SubtaskFailure::execution(&anyhow::Error::new(join_err)))
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "executor panicked".to_string()
    }
}
