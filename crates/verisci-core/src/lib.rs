#![forbid(unsafe_code)]
//! verisci-core: shared vocabulary for the verifiable research pipeline.
//!
//! Identifiers, milestones, content digests, configuration snapshots and the
//! run manifest live here. No network, no threads, no I/O.

pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod manifest;
pub mod milestone;
pub mod prelude;
pub mod time;

/// Engine version recorded in every run manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
