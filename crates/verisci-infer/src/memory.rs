//! In-process deterministic backend.
//!
//! Output is a pure function of (model, prompt, seed, temperature), so it
//! satisfies the same contract a deterministic serving stack does. Used for
//! offline runs (`memory://`) and as the test double for the pipeline and
//! verifier. Failure and drift injection exercise the unhappy paths.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use verisci_core::hash::hash_bytes;

use crate::client::{CompletionRequest, InferenceClient};
use crate::error::{BackendError, Result};
use crate::normalize::normalize_output;

type Responder = dyn Fn(&CompletionRequest) -> String + Send + Sync;

#[derive(Clone)]
pub struct DeterministicBackend {
    calls: Arc<AtomicU64>,
    fail_on_call: Option<u64>,
    drift: bool,
    responder: Option<Arc<Responder>>,
}

impl DeterministicBackend {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicU64::new(0)),
            fail_on_call: None,
            drift: false,
            responder: None,
        }
    }

    /// Fail the `n`-th call (1-based) with [`BackendError::Injected`].
    pub fn fail_on_call(mut self, n: u64) -> Self {
        self.fail_on_call = Some(n);
        self
    }

    /// Break determinism: every call's output also depends on the call count.
    pub fn with_drift(mut self) -> Self {
        self.drift = true;
        self
    }

    /// Replace the synthetic text with a caller-provided pure function.
    pub fn with_responder<F>(mut self, f: F) -> Self
    where
        F: Fn(&CompletionRequest) -> String + Send + Sync + 'static,
    {
        self.responder = Some(Arc::new(f));
        self
    }

    /// Calls received so far, including failed ones.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for DeterministicBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceClient for DeterministicBackend {
    fn complete(&self, req: &CompletionRequest) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(BackendError::Injected { call });
        }

        let raw = match &self.responder {
            Some(f) => f(req),
            None => synthetic_completion(req),
        };
        let raw = if self.drift {
            format!("{raw}\n(drift {call})")
        } else {
            raw
        };
        Ok(normalize_output(&raw))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Digest-derived text. Carries a `scores` array so ranking prompts resolve to
/// a deterministic, seed-dependent selection.
pub fn synthetic_completion(req: &CompletionRequest) -> String {
    let digest = request_digest(req);
    let bytes = digest.0;
    let scores = [
        1 + bytes[0] % 10,
        1 + bytes[1] % 10,
        1 + bytes[2] % 10,
    ];
    format!(
        "synthetic completion {} (model={}, seed={})\n{{\"scores\": [{}, {}, {}], \"title\": \"Finding {}\"}}",
        digest.short(),
        req.model,
        req.seed,
        scores[0],
        scores[1],
        scores[2],
        &digest.to_hex()[..8],
    )
}

fn request_digest(req: &CompletionRequest) -> verisci_core::hash::Hash256 {
    let mut buf = Vec::with_capacity(req.prompt.len() + req.model.len() + 16);
    buf.extend_from_slice(req.model.as_bytes());
    buf.push(0);
    buf.extend_from_slice(&req.seed.to_le_bytes());
    buf.extend_from_slice(&req.temperature.to_bits().to_le_bytes());
    buf.push(0);
    buf.extend_from_slice(req.prompt.as_bytes());
    hash_bytes(&buf)
}
