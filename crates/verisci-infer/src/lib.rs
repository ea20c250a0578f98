#![forbid(unsafe_code)]
//! verisci-infer: the deterministic inference client.
//!
//! Everything above this crate sees a single operation,
//! `complete(model, prompt, seed, temperature) -> text`, behind the
//! [`InferenceClient`] trait. Backends:
//! - `http`: an OpenAI-compatible chat-completions endpoint (ureq, blocking).
//! - `memory`: an in-process backend whose output is a pure function of the
//!   request, used offline and in tests.
//!
//! Output normalization happens here, once, so that the pipeline and the
//! verifier always fingerprint identically normalized text.

pub mod client;
pub mod error;
pub mod http;
pub mod memory;
pub mod normalize;
pub mod retry;

pub use client::{CompletionRequest, InferenceClient, PIPELINE_TEMPERATURE};
pub use error::{BackendError, Result};
pub use http::HttpInferenceClient;
pub use memory::DeterministicBackend;
pub use retry::RetryConfig;

use std::sync::Arc;

use verisci_core::config::InferenceConfig;

/// Build the correct backend for the configured endpoint.
pub fn build_client_from_config(cfg: &InferenceConfig) -> Result<Arc<dyn InferenceClient>> {
    match cfg.scheme() {
        Some("http") | Some("https") => Ok(Arc::new(HttpInferenceClient::new(cfg)?)),
        Some("memory") => Ok(Arc::new(DeterministicBackend::new())),
        Some(other) => Err(BackendError::Config(format!(
            "unsupported backend scheme '{other}'"
        ))),
        None => Err(BackendError::Config(format!(
            "endpoint '{}' has no scheme (expected https://… or memory://)",
            cfg.endpoint
        ))),
    }
}
