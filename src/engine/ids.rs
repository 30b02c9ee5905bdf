// src/engine/ids.rs

use std::time::{SystemTime, UNIX_EPOCH};

use crate::dag::TaskSpec;
use crate::engine::TaskId;

/// Produces `task_<unix-seconds>_<8 hex>` ids.
///
/// The hex suffix is a blake3 digest of the serialized spec and a
/// per-scheduler sequence number, so two submissions of the same spec within
/// one second still get distinct ids.
#[derive(Debug, Default)]
pub struct TaskIdGenerator {
    sequence: u64,
}

impl TaskIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self, spec: &TaskSpec) -> TaskId {
        self.sequence += 1;

        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let mut hasher = blake3::Hasher::new();
        // Serializing a TaskSpec cannot fail: every field is a plain value.
        hasher.update(&serde_json::to_vec(spec).unwrap_or_default());
        hasher.update(&self.sequence.to_le_bytes());
        hasher.update(&secs.to_le_bytes());
        let digest = hasher.finalize().to_hex();

        format!("task_{secs}_{}", &digest.as_str()[..8])
    }
}
