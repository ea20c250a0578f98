//! Pipeline configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

/// Default model served by the deterministic backend.
pub const DEFAULT_MODEL: &str = "gpt-oss-120b-f16";

/// Default seed for research programs.
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScientistConfig {
    /// Backend endpoint. `http(s)://host` for a live backend, `memory://` for
    /// the in-process deterministic backend.
    pub endpoint: String,

    /// Model identifier sent with every call.
    pub model: String,

    /// Seed used when a program does not set one.
    pub seed: u64,

    /// Completion length cap forwarded to the backend.
    pub max_tokens: u32,

    /// Bearer token for the backend, if it requires one.
    pub api_key: Option<String>,

    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,

    /// Retry policy for transport failures that produced no response.
    pub retry_max_retries: usize,
    pub retry_initial_backoff_ms: u64,
    pub retry_max_backoff_ms: u64,
}

impl Default for ScientistConfig {
    fn default() -> Self {
        Self {
            endpoint: "memory://".to_string(),
            model: DEFAULT_MODEL.to_string(),
            seed: DEFAULT_SEED,
            max_tokens: 4096,
            api_key: None,
            connect_timeout_ms: 15_000,
            request_timeout_ms: 120_000,
            retry_max_retries: 1,
            retry_initial_backoff_ms: 2_000,
            retry_max_backoff_ms: 8_000,
        }
    }
}

/// Snapshot consumed by the inference layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub endpoint: String,
    pub max_tokens: u32,
    pub api_key: Option<String>,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub retry_max_retries: usize,
    pub retry_initial_backoff_ms: u64,
    pub retry_max_backoff_ms: u64,
}

impl InferenceConfig {
    pub fn scheme(&self) -> Option<&str> {
        self.endpoint
            .split("://")
            .next()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty() && self.endpoint.contains("://"))
    }
}

impl ScientistConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `VERISCI_ENDPOINT`: backend endpoint (`https://…` or `memory://`)
    /// - `VERISCI_MODEL`: model identifier
    /// - `VERISCI_SEED`: default seed
    /// - `VERISCI_MAX_TOKENS`: completion length cap
    /// - `VERISCI_API_KEY`: bearer token
    /// - `VERISCI_CONNECT_TIMEOUT_MS`, `VERISCI_REQUEST_TIMEOUT_MS`
    /// - `VERISCI_RETRY_MAX_RETRIES`, `VERISCI_RETRY_INITIAL_MS`, `VERISCI_RETRY_MAX_MS`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("VERISCI_ENDPOINT") {
            cfg.endpoint = s;
        }

        if let Ok(s) = std::env::var("VERISCI_MODEL") {
            cfg.model = s;
        }

        if let Ok(s) = std::env::var("VERISCI_SEED") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.seed = v;
            }
        }

        if let Ok(s) = std::env::var("VERISCI_MAX_TOKENS") {
            if let Ok(v) = s.parse::<u32>() {
                cfg.max_tokens = v;
            }
        }

        if let Ok(s) = std::env::var("VERISCI_API_KEY") {
            cfg.api_key = Some(s);
        }

        if let Ok(s) = std::env::var("VERISCI_CONNECT_TIMEOUT_MS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.connect_timeout_ms = v;
            }
        }

        if let Ok(s) = std::env::var("VERISCI_REQUEST_TIMEOUT_MS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.request_timeout_ms = v;
            }
        }

        if let Ok(s) = std::env::var("VERISCI_RETRY_MAX_RETRIES") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.retry_max_retries = v;
            }
        }

        if let Ok(s) = std::env::var("VERISCI_RETRY_INITIAL_MS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.retry_initial_backoff_ms = v;
            }
        }

        if let Ok(s) = std::env::var("VERISCI_RETRY_MAX_MS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.retry_max_backoff_ms = v;
            }
        }

        cfg
    }

    /// Produce the configuration snapshot used by the inference layer.
    pub fn inference_config(&self) -> InferenceConfig {
        InferenceConfig {
            endpoint: trim_endpoint(&self.endpoint),
            max_tokens: self.max_tokens,
            api_key: self.api_key.clone(),
            connect_timeout_ms: self.connect_timeout_ms,
            request_timeout_ms: self.request_timeout_ms,
            retry_max_retries: self.retry_max_retries,
            retry_initial_backoff_ms: self.retry_initial_backoff_ms,
            retry_max_backoff_ms: self.retry_max_backoff_ms,
        }
    }
}

/// Drop trailing slashes after the scheme; `memory://` stays intact.
fn trim_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim();
    match endpoint.split_once("://") {
        Some((scheme, rest)) => format!("{scheme}://{}", rest.trim_end_matches('/')),
        None => endpoint.trim_end_matches('/').to_string(),
    }
}
