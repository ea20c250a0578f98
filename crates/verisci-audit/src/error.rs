use thiserror::Error;

use verisci_core::id::StepId;

/// Result type local to verisci-audit.
pub type Result<T> = std::result::Result<T, AuditError>;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("step {0} not found in audit log")]
    NotFound(StepId),

    #[error("audit trail out of order: {next} follows {prev}")]
    OutOfOrder { prev: StepId, next: StepId },

    #[error("audit trail ends at {0}; no step id remains for appends")]
    IdsExhausted(StepId),

    #[error("audit trail (de)serialization: {0}")]
    Serde(String),
}

impl From<serde_json::Error> for AuditError {
    fn from(e: serde_json::Error) -> Self {
        AuditError::Serde(e.to_string())
    }
}
