//! Re-execution verification.
//!
//! Looks up a logged step, re-sends the exact stored model, prompt, seed and
//! temperature to the backend, fingerprints the fresh output and compares it
//! with the stored output digest. The re-sent prompt must also reproduce the
//! stored prompt digest; an edited prompt never verifies. Independent of
//! pipeline state: any logged step can be checked at any time, any number of
//! times.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use verisci_audit::{AuditLog, VerifyStatus};
use verisci_core::hash::{hash_str, Hash256};
use verisci_core::id::StepId;
use verisci_core::milestone::Milestone;
use verisci_infer::{CompletionRequest, InferenceClient};

use crate::error::VerifyError;
use crate::metrics::emit_span;

#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub step_id: StepId,
    pub milestone: Milestone,
    pub matched: bool,
    pub original_hash: Hash256,
    pub recomputed_hash: Hash256,
    /// Digest of the prompt that was actually re-sent.
    pub prompt_hash: Hash256,
    /// Whether `prompt_hash` equals the digest recorded with the entry.
    pub prompt_intact: bool,
    pub model: String,
    pub seed: u64,
}

impl VerificationReport {
    pub fn status(&self) -> VerifyStatus {
        if self.matched {
            VerifyStatus::Verified
        } else {
            VerifyStatus::Mismatched
        }
    }
}

#[derive(Clone)]
pub struct Verifier {
    client: Arc<dyn InferenceClient>,
}

impl Verifier {
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self { client }
    }

    pub fn verify(&self, log: &AuditLog, step_id: StepId) -> Result<VerificationReport, VerifyError> {
        let entry = log.get(step_id)?;
        let prompt_hash = hash_str(&entry.prompt);
        let prompt_intact = prompt_hash == entry.prompt_hash;

        let req = CompletionRequest {
            temperature: entry.temperature,
            ..CompletionRequest::deterministic(entry.model.clone(), entry.prompt.clone(), entry.seed)
        };
        let started = Instant::now();
        let fresh = self
            .client
            .complete(&req)
            .map_err(|source| VerifyError::Backend {
                step: step_id,
                source,
            })?;
        let recomputed_hash = hash_str(&fresh);
        let matched = prompt_intact && recomputed_hash == entry.output_hash;

        let report = VerificationReport {
            step_id,
            milestone: entry.milestone,
            matched,
            original_hash: entry.output_hash,
            recomputed_hash,
            prompt_hash,
            prompt_intact,
            model: entry.model,
            seed: entry.seed,
        };
        log.mark_verified(step_id, report.status())?;

        if matched {
            tracing::info!(step = %step_id, hash = %recomputed_hash.short(), "step verified");
        } else {
            tracing::warn!(
                step = %step_id,
                milestone = %report.milestone,
                original = %report.original_hash,
                recomputed = %report.recomputed_hash,
                prompt_intact,
                "verification mismatch: re-executed step does not reproduce the recorded digests"
            );
        }
        emit_span(
            "verify",
            &[
                ("step", step_id.to_string()),
                ("matched", matched.to_string()),
                ("latency_ms", started.elapsed().as_millis().to_string()),
            ],
        );
        Ok(report)
    }

    /// Verify every entry in step order.
    pub fn verify_all(&self, log: &AuditLog) -> Result<Vec<VerificationReport>, VerifyError> {
        log.list()
            .iter()
            .map(|e| self.verify(log, e.step_id))
            .collect()
    }
}
