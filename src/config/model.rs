// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [scheduler]
/// max_parallel_tasks = 4
/// subtask_timeout = "30s"
/// ```
///
/// Every section is optional and has a default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub scheduler: SchedulerSection,
}

/// `[scheduler]` section, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// Number of workers shared by every task of one scheduler.
    #[serde(default = "default_max_parallel_tasks")]
    pub max_parallel_tasks: usize,

    /// Per-subtask deadline such as `"500ms"`, `"30s"` or `"2m"`.
    ///
    /// Unset means subtasks may run indefinitely.
    #[serde(default)]
    pub subtask_timeout: Option<String>,
}

fn default_max_parallel_tasks() -> usize {
    4
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            max_parallel_tasks: default_max_parallel_tasks(),
            subtask_timeout: None,
        }
    }
}

/// Validated scheduler settings.
///
/// Built from a [`RawConfigFile`] via `TryFrom`, or directly in code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub max_parallel_tasks: usize,
    pub subtask_timeout: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_parallel_tasks: default_max_parallel_tasks(),
            subtask_timeout: None,
        }
    }
}

impl SchedulerConfig {
    pub fn with_max_parallel_tasks(mut self, n: usize) -> Self {
        self.max_parallel_tasks = n;
        self
    }

    pub fn with_subtask_timeout(mut self, timeout: Duration) -> Self {
        self.subtask_timeout = Some(timeout);
        self
    }
}
