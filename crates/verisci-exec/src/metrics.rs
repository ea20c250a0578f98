//! Metrics/tracing hooks.
//!
//! Emits trace-level events inside a `verisci` span. Wire a subscriber in the
//! binary layer to collect them.

pub fn emit_span(event: &str, key_values: &[(&str, String)]) {
    let span = tracing::trace_span!("verisci", event);
    let _entered = span.enter();
    for (k, v) in key_values {
        tracing::trace!(%event, %k, %v, "metric");
    }
}
