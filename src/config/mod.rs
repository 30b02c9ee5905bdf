// src/config/mod.rs

//! Configuration loading and validation for taskdag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load scheduler config and task specs from disk (`loader.rs`).
//! - Validate and convert the raw model (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_task_spec};
pub use model::{RawConfigFile, SchedulerConfig, SchedulerSection};
pub use validate::parse_duration;
