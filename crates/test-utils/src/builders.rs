use taskdag::{Action, Step, Subtask, TaskSpec};

/// Builder for a single [`Subtask`].
///
/// The action kind defaults to the subtask id, which is what
/// [`crate::RecordingExecutor`] keys its behaviour on.
pub struct SubtaskBuilder {
    subtask: Subtask,
}

impl SubtaskBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            subtask: Subtask::new(id, Action::new(id)),
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.subtask = self.subtask.after(dep);
        self
    }

    pub fn after_all(mut self, deps: &[&str]) -> Self {
        for dep in deps {
            self.subtask = self.subtask.after(*dep);
        }
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.subtask = self.subtask.with_description(description);
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.subtask.action = action;
        self
    }

    pub fn build(self) -> Subtask {
        self.subtask
    }
}

/// Builder for [`TaskSpec`] to simplify test setup.
pub struct TaskSpecBuilder {
    spec: TaskSpec,
    subtasks: Vec<Subtask>,
}

impl TaskSpecBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            spec: TaskSpec::new(name),
            subtasks: Vec::new(),
        }
    }

    /// Add an explicit subtask whose action kind is its id.
    pub fn subtask(mut self, id: &str, deps: &[&str]) -> Self {
        self.subtasks
            .push(SubtaskBuilder::new(id).after_all(deps).build());
        self
    }

    pub fn with_subtask(mut self, subtask: Subtask) -> Self {
        self.subtasks.push(subtask);
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.spec.steps.push(step);
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.spec.description = Some(description.to_string());
        self
    }

    /// Explicit subtasks, if any were added, override steps.
    pub fn build(self) -> TaskSpec {
        if self.subtasks.is_empty() {
            self.spec
        } else {
            self.spec.with_subtasks(self.subtasks)
        }
    }
}

/// Linear chain `ids[0] -> ids[1] -> ...`.
pub fn chain(name: &str, ids: &[&str]) -> TaskSpec {
    let mut builder = TaskSpecBuilder::new(name);
    for (i, id) in ids.iter().enumerate() {
        let deps: Vec<&str> = if i == 0 { Vec::new() } else { vec![ids[i - 1]] };
        builder = builder.subtask(id, &deps);
    }
    builder.build()
}

/// `A -> {B, C} -> D`.
pub fn diamond(name: &str) -> TaskSpec {
    TaskSpecBuilder::new(name)
        .subtask("A", &[])
        .subtask("B", &["A"])
        .subtask("C", &["A"])
        .subtask("D", &["B", "C"])
        .build()
}
