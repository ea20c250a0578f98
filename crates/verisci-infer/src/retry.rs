use std::thread;
use std::time::Duration;

use crate::error::{BackendError, Result};

/// Retry/backoff configuration for transport failures that produced no response.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryConfig {
    /// Run `op`, re-running it only on errors for which
    /// [`BackendError::is_retryable`] holds. Every retry is logged.
    pub fn run<T, F>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut attempt = 0usize;
        let mut backoff = self.initial_backoff;

        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= self.max_retries || !err.is_retryable() {
                        return Err(err);
                    }
                    attempt += 1;
                    tracing::warn!(
                        %what,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "retrying backend call that produced no response"
                    );
                    thread::sleep(backoff);
                    backoff = std::cmp::min(backoff * 2, self.max_backoff);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast(max_retries: usize) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        }
    }

    #[test]
    fn retries_connection_failures_then_succeeds() {
        let calls = Cell::new(0);
        let out = fast(2).run("test", || {
            calls.set(calls.get() + 1);
            if calls.get() < 2 {
                Err(BackendError::Transport {
                    kind: "connection",
                    detail: "refused".into(),
                })
            } else {
                Ok("ok")
            }
        });
        assert_eq!(out.unwrap(), "ok");
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn never_retries_after_a_response() {
        let calls = Cell::new(0);
        let out: Result<()> = fast(5).run("test", || {
            calls.set(calls.get() + 1);
            Err(BackendError::Status {
                code: 502,
                detail: "bad gateway".into(),
            })
        });
        assert!(matches!(out, Err(BackendError::Status { code: 502, .. })));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn timeouts_are_not_retried() {
        let calls = Cell::new(0);
        let out: Result<()> = fast(5).run("test", || {
            calls.set(calls.get() + 1);
            Err(BackendError::Transport {
                kind: "timeout",
                detail: "read timed out".into(),
            })
        });
        assert!(out.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let calls = Cell::new(0);
        let out: Result<()> = fast(2).run("test", || {
            calls.set(calls.get() + 1);
            Err(BackendError::Transport {
                kind: "dns",
                detail: "no such host".into(),
            })
        });
        assert!(out.is_err());
        assert_eq!(calls.get(), 3);
    }
}
