// src/dag/spec.rs

use serde::{Deserialize, Serialize};

use crate::dag::subtask::{Action, Subtask};

/// Caller-supplied description of a unit of work.
///
/// How it is split into subtasks is up to the [`crate::exec::Decomposer`].
/// The built-in [`crate::exec::StepDecomposer`] honours, in order:
/// - `subtasks`: a fixed, explicit subtask list,
/// - `steps`: a sequence of steps, chained unless marked `parallel`,
/// - otherwise a default three-step chain.
///
/// ```toml
/// name = "Generate report"
///
/// [[subtasks]]
/// id = "collect_data"
/// action = { type = "collect" }
///
/// [[subtasks]]
/// id = "analyze_data"
/// action = { type = "analyze" }
/// after = ["collect_data"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub steps: Vec<Step>,

    #[serde(default)]
    pub subtasks: Option<Vec<Subtask>>,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Use an explicit subtask list instead of automatic decomposition.
    pub fn with_subtasks(mut self, subtasks: Vec<Subtask>) -> Self {
        self.subtasks = Some(subtasks);
        self
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }
}

/// One entry of [`TaskSpec::steps`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub action: Action,

    /// If `false` (default) the step waits for the previous one.
    #[serde(default)]
    pub parallel: bool,
}

impl Step {
    pub fn new(action: Action) -> Self {
        Self {
            description: None,
            action,
            parallel: false,
        }
    }

    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
