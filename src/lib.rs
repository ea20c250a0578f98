#![forbid(unsafe_code)]
//! verisci: a research pipeline whose every inference step is fingerprinted,
//! logged, and re-executable.
//!
//! This crate re-exports the workspace members; the binary lives in
//! `verisci-cli`.

pub use verisci_audit as audit;
pub use verisci_core as core;
pub use verisci_exec as exec;
pub use verisci_infer as infer;
pub use verisci_planner as planner;
