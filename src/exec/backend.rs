// src/exec/backend.rs

//! Executor abstraction.
//!
//! The worker pool talks to an `Executor` instead of running anything itself.
//! Production code plugs in whatever actually performs actions; tests provide
//! executors that record calls, fail, panic or block on demand.

use std::time::{Duration, Instant};

use serde_json::json;
use tracing::debug;

use crate::dag::Action;
use crate::exec::ExecFuture;

/// Runs one subtask action.
///
/// Errors and panics are both contained by the worker that made the call and
/// recorded as a failure entry for that subtask. Implementations must be
/// shareable across workers.
pub trait Executor: Send + Sync + 'static {
    fn run<'a>(&'a self, action: &'a Action) -> ExecFuture<'a>;
}

/// Executor that performs nothing and reports a canned success.
///
/// Useful for dry runs and demos: every action succeeds after `delay` with
///
/// ```json
/// { "status": "completed", "result": "Executed <type> action", "execution_time": 0.1 }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SimulatedExecutor {
    delay: Duration,
}

impl SimulatedExecutor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Executor for SimulatedExecutor {
    fn run<'a>(&'a self, action: &'a Action) -> ExecFuture<'a> {
        Box::pin(async move {
            let started = Instant::now();
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            debug!(action = %action.kind, "simulated action");

            Ok(json!({
                "status": "completed",
                "result": format!("Executed {} action", action.kind),
                "execution_time": started.elapsed().as_secs_f64(),
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulated_executor_reports_action_kind() {
        let exec = SimulatedExecutor::default();
        let payload = exec.run(&Action::new("collect")).await.unwrap();

        assert_eq!(payload["status"], "completed");
        assert_eq!(payload["result"], "Executed collect action");
        assert!(payload["execution_time"].as_f64().is_some());
    }
}
