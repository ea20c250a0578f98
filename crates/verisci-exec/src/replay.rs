//! Provenance and whole-trail replay.
//!
//! The manifest pins the program digest and a root digest over every step's
//! fingerprints. Replay re-executes every step of a trail through the
//! verifier, which is how a third party checks an exported run.

use serde::Serialize;

use verisci_audit::AuditLog;
use verisci_core::id::StepId;
use verisci_core::manifest::RunManifest;
use verisci_core::time::now_millis;

use crate::error::VerifyError;
use crate::run::PipelineRun;
use crate::verifier::{VerificationReport, Verifier};

/// Manifest for a run whose audit log is final.
pub fn build_manifest(run: &PipelineRun) -> RunManifest {
    let program = run.program();
    RunManifest::new(
        run.id(),
        program.program_hash(),
        program.model.clone(),
        program.seed,
        run.started_ms(),
    )
    .finish(now_millis(), run.audit().root_hash(), run.audit().len())
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    pub total: usize,
    pub matched: usize,
    pub mismatched: Vec<StepId>,
    pub reports: Vec<VerificationReport>,
}

impl ReplaySummary {
    pub fn all_matched(&self) -> bool {
        self.mismatched.is_empty() && self.matched == self.total
    }
}

/// Verify every step of `log` in step order. Stops at the first backend
/// failure; mismatches are collected, not fatal.
pub fn replay_log(verifier: &Verifier, log: &AuditLog) -> Result<ReplaySummary, VerifyError> {
    let reports = verifier.verify_all(log)?;
    let mismatched: Vec<StepId> = reports
        .iter()
        .filter(|r| !r.matched)
        .map(|r| r.step_id)
        .collect();
    Ok(ReplaySummary {
        total: reports.len(),
        matched: reports.len() - mismatched.len(),
        mismatched,
        reports,
    })
}
