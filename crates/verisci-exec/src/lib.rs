#![forbid(unsafe_code)]
//! verisci-exec: milestone pipeline, verifier, sessions, and provenance.
//!
//! A run executes its eight backend calls sequentially on a worker thread and
//! appends each result to the run's audit log before issuing the next call.
//! Status and audit reads, and verification, can happen from any thread while
//! a run is in progress.

pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod replay;
pub mod run;
pub mod session;
pub mod verifier;

pub use error::{ExecError, PipelineError, VerifyError};
pub use pipeline::{MilestoneObserver, Pipeline};
pub use replay::{build_manifest, replay_log, ReplaySummary};
pub use run::{MilestoneArtifact, MilestoneResult, PipelineRun, RunSnapshot, RunStatus};
pub use session::{RunHandle, SessionRegistry};
pub use verifier::{VerificationReport, Verifier};
