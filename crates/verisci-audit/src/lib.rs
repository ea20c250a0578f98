#![forbid(unsafe_code)]
//! verisci-audit: the append-only audit trail.
//!
//! One `AuditEntry` per backend call, fingerprinted at append time. Entries are
//! immutable once appended except for their verification status, which only
//! the verifier changes. The log is safe to read while a run is appending.

pub mod entry;
pub mod error;
pub mod log;

pub use entry::{AuditEntry, IntegrityIssue, VerifyStatus};
pub use error::{AuditError, Result};
pub use log::{AuditLog, NewStep};
