use thiserror::Error;

/// Result type local to verisci-infer.
pub type Result<T> = std::result::Result<T, BackendError>;

#[derive(Debug, Error)]
pub enum BackendError {
    /// No usable response: DNS, connect, TLS, timeout.
    #[error("backend transport error ({kind}): {detail}")]
    Transport { kind: &'static str, detail: String },

    /// The backend answered with a non-2xx status.
    #[error("backend returned http {code}: {detail}")]
    Status { code: u16, detail: String },

    /// The backend answered 2xx but the body was not a completion.
    #[error("backend response could not be decoded: {0}")]
    Decode(String),

    #[error("backend configuration error: {0}")]
    Config(String),

    /// Failure injected by the in-process backend.
    #[error("injected backend failure on call {call}")]
    Injected { call: u64 },
}

impl BackendError {
    /// True when the request never produced a response, so re-sending cannot
    /// yield a second, different output for the same step.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BackendError::Transport {
                kind: "dns" | "connection",
                ..
            }
        )
    }
}
