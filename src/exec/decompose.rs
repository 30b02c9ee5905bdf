// src/exec/decompose.rs

//! Turning a [`TaskSpec`] into subtasks.

use anyhow::Result;
use tracing::debug;

use crate::dag::{Action, Subtask, TaskSpec};

/// Splits a task spec into subtasks with dependencies.
///
/// The output is validated by [`crate::dag::TaskGraph::new`] afterwards, so
/// implementations do not need to check for cycles or dangling ids.
pub trait Decomposer: Send + Sync {
    fn decompose(&self, spec: &TaskSpec) -> Result<Vec<Subtask>>;
}

/// Default decomposer.
///
/// 1. `spec.subtasks`, if present, is used verbatim.
/// 2. Otherwise each entry of `spec.steps` becomes `subtask_<n>` (1-based).
///    A step depends on the previous one unless it is marked `parallel`.
/// 3. With neither, the task becomes `initialize -> process -> finalize`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepDecomposer;

impl Decomposer for StepDecomposer {
    fn decompose(&self, spec: &TaskSpec) -> Result<Vec<Subtask>> {
        if let Some(subtasks) = &spec.subtasks {
            debug!(task = %spec.name, count = subtasks.len(), "using explicit subtasks");
            return Ok(subtasks.clone());
        }

        if !spec.steps.is_empty() {
            let mut out: Vec<Subtask> = Vec::with_capacity(spec.steps.len());
            for (i, step) in spec.steps.iter().enumerate() {
                let mut subtask = Subtask::new(subtask_id(i), step.action.clone());
                subtask.description = step.description.clone();
                if i > 0 && !step.parallel {
                    subtask = subtask.after(subtask_id(i - 1));
                }
                out.push(subtask);
            }
            debug!(task = %spec.name, count = out.len(), "decomposed steps");
            return Ok(out);
        }

        let chain = [
            ("initialize", "Initialize task"),
            ("process", "Process main task logic"),
            ("finalize", "Finalize and cleanup"),
        ];

        let out = chain
            .iter()
            .enumerate()
            .map(|(i, (kind, description))| {
                let subtask = Subtask::new(subtask_id(i), Action::new(*kind))
                    .with_description(*description);
                if i == 0 {
                    subtask
                } else {
                    subtask.after(subtask_id(i - 1))
                }
            })
            .collect();

        debug!(task = %spec.name, "decomposed into default chain");
        Ok(out)
    }
}

fn subtask_id(index: usize) -> String {
    format!("subtask_{}", index + 1)
}

/// Decomposer that ignores the [`TaskSpec`] and always returns the same subtasks.
#[derive(Debug, Clone, Default)]
pub struct FixedDecomposer {
    subtasks: Vec<Subtask>,
}

impl FixedDecomposer {
    pub fn new(subtasks: Vec<Subtask>) -> Self {
        Self { subtasks }
    }
}

impl Decomposer for FixedDecomposer {
    fn decompose(&self, _spec: &TaskSpec) -> Result<Vec<Subtask>> {
        Ok(self.subtasks.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::Step;

    fn deps(subtask: &Subtask) -> Vec<&str> {
        subtask.dependencies.iter().map(String::as_str).collect()
    }

    #[test]
    fn explicit_subtasks_win() {
        let spec = TaskSpec::new("t")
            .with_step(Step::new(Action::new("ignored")))
            .with_subtasks(vec![Subtask::new("only", Action::new("x"))]);

        let out = StepDecomposer.decompose(&spec).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "only");
    }

    #[test]
    fn steps_chain_unless_parallel() {
        let spec = TaskSpec::new("t")
            .with_step(Step::new(Action::new("a")))
            .with_step(Step::new(Action::new("b")))
            .with_step(Step::new(Action::new("c")).parallel())
            .with_step(Step::new(Action::new("d")).with_description("last"));

        let out = StepDecomposer.decompose(&spec).unwrap();
        let ids: Vec<&str> = out.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["subtask_1", "subtask_2", "subtask_3", "subtask_4"]);

        assert!(deps(&out[0]).is_empty());
        assert_eq!(deps(&out[1]), vec!["subtask_1"]);
        assert!(deps(&out[2]).is_empty());
        assert_eq!(deps(&out[3]), vec!["subtask_3"]);
        assert_eq!(out[3].description.as_deref(), Some("last"));
    }

    #[test]
    fn empty_spec_gets_default_chain() {
        let out = StepDecomposer.decompose(&TaskSpec::new("t")).unwrap();
        let kinds: Vec<&str> = out.iter().map(|s| s.action.kind.as_str()).collect();
        assert_eq!(kinds, vec!["initialize", "process", "finalize"]);
        assert_eq!(deps(&out[2]), vec!["subtask_2"]);
    }

    #[test]
    fn fixed_decomposer_ignores_the_spec() {
        let fixed = FixedDecomposer::new(vec![Subtask::new("A", Action::new("a"))]);
        let spec = TaskSpec::new("t").with_step(Step::new(Action::new("b")));
        let out = fixed.decompose(&spec).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "A");
    }
}
