use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since Unix epoch (UTC).
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
