//! OpenAI-compatible chat-completions backend over blocking HTTP.

use std::time::Duration;

use serde_json::{json, Value};

use verisci_core::config::InferenceConfig;

use crate::client::{CompletionRequest, InferenceClient};
use crate::error::{BackendError, Result};
use crate::normalize::normalize_output;
use crate::retry::RetryConfig;

const COMPLETIONS_PATH: &str = "/api/chat/completions";
const USER_AGENT: &str = concat!("verisci/", env!("CARGO_PKG_VERSION"));
const ERROR_DETAIL_MAX: usize = 300;

pub struct HttpInferenceClient {
    agent: ureq::Agent,
    url: String,
    api_key: Option<String>,
    max_tokens: u32,
    retry: RetryConfig,
}

impl HttpInferenceClient {
    pub fn new(cfg: &InferenceConfig) -> Result<Self> {
        if cfg.request_timeout_ms == 0 || cfg.connect_timeout_ms == 0 {
            return Err(BackendError::Config("timeouts must be > 0".into()));
        }
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_millis(cfg.connect_timeout_ms))
            .timeout_read(Duration::from_millis(cfg.request_timeout_ms))
            .timeout_write(Duration::from_millis(cfg.request_timeout_ms))
            .user_agent(USER_AGENT)
            .build();
        Ok(Self {
            agent,
            url: format!("{}{}", cfg.endpoint.trim_end_matches('/'), COMPLETIONS_PATH),
            api_key: cfg.api_key.clone(),
            max_tokens: cfg.max_tokens,
            retry: RetryConfig {
                max_retries: cfg.retry_max_retries,
                initial_backoff: Duration::from_millis(cfg.retry_initial_backoff_ms),
                max_backoff: Duration::from_millis(cfg.retry_max_backoff_ms),
            },
        })
    }

    fn send_once(&self, payload: &str) -> Result<Value> {
        let mut req = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json")
            .set("Accept", "application/json");
        if let Some(key) = self.api_key.as_deref() {
            req = req.set("Authorization", &format!("Bearer {key}"));
        }
        match req.send_string(payload) {
            Ok(resp) => serde_json::from_reader(resp.into_reader())
                .map_err(|e| BackendError::Decode(format!("json: {e}"))),
            Err(ureq::Error::Status(code, resp)) => {
                let mut detail = resp.into_string().unwrap_or_default();
                truncate_chars(&mut detail, ERROR_DETAIL_MAX);
                Err(BackendError::Status { code, detail })
            }
            Err(ureq::Error::Transport(transport)) => Err(error_from_transport(transport)),
        }
    }
}

/// Build the request body. The prompt is sent as a single user message so
/// the stored prompt text is exactly what the backend saw.
pub fn completion_payload(req: &CompletionRequest, max_tokens: u32) -> Value {
    json!({
        "model": req.model,
        "messages": [{ "role": "user", "content": req.prompt }],
        "seed": req.seed,
        "temperature": req.temperature,
        "max_tokens": max_tokens,
    })
}

/// Pull `choices[0].message.content` out of a completion body.
pub fn extract_content(body: &Value) -> Result<String> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            let mut shown = body.to_string();
            truncate_chars(&mut shown, ERROR_DETAIL_MAX);
            BackendError::Decode(format!("missing choices[0].message.content in {shown}"))
        })
}

impl InferenceClient for HttpInferenceClient {
    fn complete(&self, req: &CompletionRequest) -> Result<String> {
        let max_tokens = req.max_tokens.min(self.max_tokens);
        let payload = completion_payload(req, max_tokens).to_string();
        let body = self.retry.run(&req.model, || self.send_once(&payload))?;
        let raw = extract_content(&body)?;
        Ok(normalize_output(&raw))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

fn error_from_transport(transport: ureq::Transport) -> BackendError {
    let kind = match transport.kind() {
        ureq::ErrorKind::Dns => "dns",
        ureq::ErrorKind::ConnectionFailed => "connection",
        ureq::ErrorKind::InvalidUrl | ureq::ErrorKind::UnknownScheme => "config",
        ureq::ErrorKind::Io => classify_io(&transport.to_string()),
        _ => "transport",
    };
    BackendError::Transport {
        kind,
        detail: transport.to_string(),
    }
}

fn classify_io(raw: &str) -> &'static str {
    let lower = raw.to_ascii_lowercase();
    if lower.contains("timed out") || lower.contains("timeout") {
        "timeout"
    } else {
        "io"
    }
}

fn truncate_chars(s: &mut String, max: usize) {
    if let Some((idx, _)) = s.char_indices().nth(max) {
        s.truncate(idx);
    }
}
