//! The inference contract shared by every backend.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Temperature used for every pipeline and verification call.
pub const PIPELINE_TEMPERATURE: f32 = 0.0;

/// Default completion length cap.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub seed: u64,
    pub temperature: f32,
    /// Backends may override this with their configured cap.
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// A request pinned to temperature 0.
    pub fn deterministic(model: impl Into<String>, prompt: impl Into<String>, seed: u64) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            seed,
            temperature: PIPELINE_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Synchronous text completion.
///
/// Implementations return the backend's text after [`crate::normalize`] and
/// must never retry in a way that could produce two different outputs for one
/// request.
pub trait InferenceClient: Send + Sync {
    fn complete(&self, req: &CompletionRequest) -> Result<String>;

    /// Short backend label for logs.
    fn name(&self) -> &'static str {
        "backend"
    }
}

impl<T: InferenceClient + ?Sized> InferenceClient for std::sync::Arc<T> {
    fn complete(&self, req: &CompletionRequest) -> Result<String> {
        (**self).complete(req)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
