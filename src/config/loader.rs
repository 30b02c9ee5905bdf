// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{RawConfigFile, SchedulerConfig};
use crate::dag::TaskSpec;
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it into a
/// [`SchedulerConfig`].
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<SchedulerConfig> {
    let raw_config = load_from_path(&path)?;
    let config = SchedulerConfig::try_from(raw_config)?;
    Ok(config)
}

/// Load a task spec from a TOML file.
///
/// Subtask ids and dependencies are not checked here; that happens when the
/// spec is submitted.
pub fn load_task_spec(path: impl AsRef<Path>) -> Result<TaskSpec> {
    let contents = fs::read_to_string(path.as_ref())?;
    let spec: TaskSpec = toml::from_str(&contents)?;
    Ok(spec)
}
