use thiserror::Error;

use verisci_audit::AuditError;
use verisci_core::id::{RunId, SessionId, StepId};
use verisci_core::milestone::Milestone;
use verisci_infer::BackendError;
use verisci_planner::PlanError;

/// A run could not finish.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{milestone} {action} (step {step}) failed: {source}")]
    Backend {
        milestone: Milestone,
        action: &'static str,
        /// The step id the call would have been logged under.
        step: StepId,
        #[source]
        source: BackendError,
    },

    #[error("run {run} is not runnable: {state}")]
    NotRunnable { run: RunId, state: String },
}

/// A verification could not be performed. A hash mismatch is *not* an error;
/// it is reported through `VerificationReport::matched`.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("step {0} not found")]
    NotFound(StepId),

    #[error("re-execution of {step} failed: {source}")]
    Backend {
        step: StepId,
        #[source]
        source: BackendError,
    },

    #[error(transparent)]
    Audit(AuditError),
}

impl From<AuditError> for VerifyError {
    fn from(e: AuditError) -> Self {
        match e {
            AuditError::NotFound(step) => VerifyError::NotFound(step),
            other => VerifyError::Audit(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("session already has an active run ({0}); wait for it to finish")]
    RunActive(RunId),

    #[error("unknown session {0}")]
    UnknownSession(SessionId),

    #[error("session {0} has not started a run")]
    NoRun(SessionId),

    #[error("invalid program: {0}")]
    Program(#[from] PlanError),

    #[error("failed to spawn pipeline worker: {0}")]
    Spawn(String),

    #[error(transparent)]
    Verify(#[from] VerifyError),
}
