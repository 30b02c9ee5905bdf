// src/engine/mod.rs

//! Scheduling engine.
//!
//! This module ties together:
//! - the shared ready queue that workers drain ([`queue`]),
//! - per-task bookkeeping: lifecycle, dispatch state and results ([`registry`]),
//! - read-only progress views derived from that bookkeeping ([`status`]),
//! - the bounded pool of workers that invoke the executor ([`worker`]),
//! - the public [`Scheduler`] facade ([`scheduler`]).
//!
//! All mutable state lives behind [`dispatch::DispatchCore`]; callers only
//! reach it through `Scheduler` methods.

/// Canonical task id type used throughout the engine.
pub type TaskId = String;

pub(crate) mod dispatch;
pub mod ids;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod status;
pub mod worker;

pub use crate::types::TaskStatus;
pub use queue::{QueueItem, ReadyQueue};
pub use registry::{FailureKind, ResultEntry, ResultStore, SubtaskFailure};
pub use scheduler::{CancelAck, ExecuteAck, Scheduler};
pub use status::{ResultsReport, ResultsView, StatusView};
pub use worker::WorkerPool;
