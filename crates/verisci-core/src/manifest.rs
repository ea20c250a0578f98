//! Run manifest for audit/replay.
//!
//! The engine emits a manifest after a successful run. Together with the audit
//! trail it pins down everything a third party needs to re-execute the run:
//! program digest, model, seed, and a root digest over every step's fingerprints.

use serde::{Deserialize, Serialize};

use crate::hash::Hash256;
use crate::id::RunId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,

    /// Digest of the research topic (the program definition).
    pub program_hash: Hash256,

    pub model: String,
    pub seed: u64,

    /// Engine version string for provenance.
    pub engine_version: String,

    /// Root digest over (prompt_hash, output_hash) of every step, in step order.
    pub audit_root: Option<Hash256>,

    pub total_steps: usize,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl RunManifest {
    pub fn new(
        run_id: RunId,
        program_hash: Hash256,
        model: impl Into<String>,
        seed: u64,
        started_ms: u64,
    ) -> Self {
        Self {
            run_id,
            program_hash,
            model: model.into(),
            seed,
            engine_version: crate::VERSION.to_string(),
            audit_root: None,
            total_steps: 0,
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn finish(mut self, finished_ms: u64, audit_root: Hash256, total_steps: usize) -> Self {
        self.finished_ms = finished_ms;
        self.audit_root = Some(audit_root);
        self.total_steps = total_steps;
        self
    }

    pub fn duration_ms(&self) -> u64 {
        self.finished_ms.saturating_sub(self.started_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_str;

    #[test]
    fn finish_records_root_and_duration() {
        let root = hash_str("root");
        let m = RunManifest::new(RunId::random(), hash_str("topic"), "m", 42, 1_000)
            .finish(1_250, root, 8);
        assert_eq!(m.audit_root, Some(root));
        assert_eq!(m.total_steps, 8);
        assert_eq!(m.duration_ms(), 250);
    }

    #[test]
    fn duration_never_underflows() {
        let m = RunManifest::new(RunId::random(), hash_str("topic"), "m", 42, 5_000)
            .finish(4_000, hash_str("root"), 0);
        assert_eq!(m.duration_ms(), 0);
    }
}
