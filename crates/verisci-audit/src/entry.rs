use serde::{Deserialize, Serialize};

use verisci_core::hash::{hash_str, Hash256};
use verisci_core::id::StepId;
use verisci_core::milestone::Milestone;

const PREVIEW_CHARS: usize = 300;

/// Outcome of the most recent re-execution check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyStatus {
    #[default]
    Unverified,
    Verified,
    Mismatched,
}

/// One logged backend call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub step_id: StepId,
    pub milestone: Milestone,
    /// Which call inside the milestone produced this entry.
    pub action: String,
    pub model: String,
    pub seed: u64,
    pub temperature: f32,
    pub prompt: String,
    pub prompt_hash: Hash256,
    pub output: String,
    pub output_hash: Hash256,
    /// Milliseconds since Unix epoch (UTC).
    pub timestamp_ms: u64,
    #[serde(default)]
    pub verified: VerifyStatus,
}

impl AuditEntry {
    pub fn output_preview(&self) -> &str {
        match self.output.char_indices().nth(PREVIEW_CHARS) {
            Some((idx, _)) => &self.output[..idx],
            None => &self.output,
        }
    }

    /// Recompute both digests from the stored text.
    pub fn check_integrity(&self) -> Option<IntegrityIssue> {
        let prompt_ok = hash_str(&self.prompt) == self.prompt_hash;
        let output_ok = hash_str(&self.output) == self.output_hash;
        if prompt_ok && output_ok {
            None
        } else {
            Some(IntegrityIssue {
                step_id: self.step_id,
                prompt_ok,
                output_ok,
            })
        }
    }
}

/// A stored text whose digest no longer matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityIssue {
    pub step_id: StepId,
    pub prompt_ok: bool,
    pub output_ok: bool,
}
