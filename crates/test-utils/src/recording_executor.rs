use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use taskdag::exec::ExecFuture;
use taskdag::{Action, Executor};
use tokio::sync::Notify;

/// One entry in the executor's call log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecEvent {
    Started(String),
    Finished(String),
}

#[derive(Default)]
struct State {
    events: Vec<ExecEvent>,
    running: usize,
    peak: usize,
    fail: HashSet<String>,
    panic: HashSet<String>,
    sleep: HashMap<String, Duration>,
    gates: HashMap<String, Arc<Notify>>,
}

/// A fake executor keyed by action kind that:
/// - records when each action starts and finishes
/// - tracks peak concurrency
/// - can fail, panic, sleep or block on a gate for chosen actions.
///
/// Clones share the same state, so a test can keep one handle while the
/// scheduler owns another.
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    state: Arc<Mutex<State>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `kind` return an error.
    pub fn fail_on(self, kind: &str) -> Self {
        self.state.lock().unwrap().fail.insert(kind.to_string());
        self
    }

    /// Make `kind` panic.
    pub fn panic_on(self, kind: &str) -> Self {
        self.state.lock().unwrap().panic.insert(kind.to_string());
        self
    }

    /// Make `kind` sleep before finishing.
    pub fn sleep_on(self, kind: &str, duration: Duration) -> Self {
        self.state
            .lock()
            .unwrap()
            .sleep
            .insert(kind.to_string(), duration);
        self
    }

    /// Make `kind` block until [`RecordingExecutor::release`] is called.
    pub fn gate(self, kind: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .gates
            .insert(kind.to_string(), Arc::new(Notify::new()));
        self
    }

    /// Let a gated action continue. Safe to call before it starts.
    pub fn release(&self, kind: &str) {
        let gate = self.state.lock().unwrap().gates.get(kind).cloned();
        if let Some(gate) = gate {
            gate.notify_one();
        }
    }

    pub fn events(&self) -> Vec<ExecEvent> {
        self.state.lock().unwrap().events.clone()
    }

    /// Action kinds in the order they started.
    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ExecEvent::Started(k) => Some(k),
                ExecEvent::Finished(_) => None,
            })
            .collect()
    }

    /// Action kinds in the order they returned (success or error).
    pub fn finished(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ExecEvent::Finished(k) => Some(k),
                ExecEvent::Started(_) => None,
            })
            .collect()
    }

    pub fn was_started(&self, kind: &str) -> bool {
        self.started().iter().any(|k| k == kind)
    }

    /// Position of an event in the log.
    pub fn position(&self, event: &ExecEvent) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.state.lock().unwrap().peak
    }
}

/// Decrements the running count even if the call panics or is aborted.
struct RunningGuard {
    state: Arc<Mutex<State>>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.running = state.running.saturating_sub(1);
    }
}

impl Executor for RecordingExecutor {
    fn run<'a>(&'a self, action: &'a Action) -> ExecFuture<'a> {
        let state = Arc::clone(&self.state);
        let kind = action.kind.clone();

        Box::pin(async move {
            let (gate, sleep, fail, panic) = {
                let mut s = state.lock().unwrap();
                s.events.push(ExecEvent::Started(kind.clone()));
                s.running += 1;
                s.peak = s.peak.max(s.running);
                (
                    s.gates.get(&kind).cloned(),
                    s.sleep.get(&kind).copied(),
                    s.fail.contains(&kind),
                    s.panic.contains(&kind),
                )
            };
            let _guard = RunningGuard {
                state: Arc::clone(&state),
            };

            if let Some(gate) = gate {
                gate.notified().await;
            }
            if let Some(duration) = sleep {
                tokio::time::sleep(duration).await;
            }
            if panic {
                panic!("injected panic in {kind}");
            }

            state
                .lock()
                .unwrap()
                .events
                .push(ExecEvent::Finished(kind.clone()));

            if fail {
                anyhow::bail!("injected failure in {kind}");
            }
            Ok(json!({ "subtask": kind }))
        })
    }
}
