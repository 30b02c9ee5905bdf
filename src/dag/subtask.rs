// src/dag/subtask.rs

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Subtask identifier, unique within one task graph.
pub type SubtaskId = String;

/// Opaque description of what a subtask should do.
///
/// The scheduler never interprets this; it is handed verbatim to the
/// [`crate::exec::Executor`].
///
/// ```toml
/// action = { type = "collect", params = { sources = ["db1", "db2"] } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type", default = "default_action_kind")]
    pub kind: String,

    #[serde(default)]
    pub params: serde_json::Value,
}

fn default_action_kind() -> String {
    "unknown".to_string()
}

impl Action {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: serde_json::Value::Null,
        }
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }
}

impl Default for Action {
    fn default() -> Self {
        Self::new(default_action_kind())
    }
}

/// One node of a task graph.
///
/// Created by a decomposer and immutable once the graph is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: SubtaskId,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub action: Action,

    /// Ids of subtasks that must succeed before this one may run.
    ///
    /// Accepts `after = [...]` as an alias in TOML.
    #[serde(default, alias = "after")]
    pub dependencies: BTreeSet<SubtaskId>,
}

impl Subtask {
    pub fn new(id: impl Into<SubtaskId>, action: Action) -> Self {
        Self {
            id: id.into(),
            description: None,
            action,
            dependencies: BTreeSet::new(),
        }
    }

    pub fn after(mut self, dependency: impl Into<SubtaskId>) -> Self {
        self.dependencies.insert(dependency.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn toml_subtask_keeps_params_and_after_alias() {
        let parsed: Subtask = toml::from_str(
            r#"
            id = "gather"
            after = ["init"]
            action = { type = "collect", params = { sources = ["db1", "db2"] } }
            "#,
        )
        .unwrap();

        let built = Subtask::new(
            "gather",
            Action::new("collect").with_params(json!({ "sources": ["db1", "db2"] })),
        )
        .after("init");
        assert_eq!(parsed, built);
    }

    #[test]
    fn missing_action_defaults_to_unknown_kind() {
        let parsed: Subtask = toml::from_str(r#"id = "bare""#).unwrap();
        assert_eq!(parsed.action, Action::default());
        assert!(parsed.action.params.is_null());
    }
}
