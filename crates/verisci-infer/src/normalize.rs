//! Output normalization applied to every completion before it is returned.
//!
//! Some served models emit a reasoning channel in-band:
//! `<|channel|>analysis<|message|> … <|end|>` followed by the final answer,
//! sometimes with further `<|…|>` control tokens. The analysis block is
//! dropped, remaining control tokens are removed, and the result is trimmed.
//! Because the pipeline and the verifier both go through a client, they always
//! fingerprint the same normalized text.

const CHANNEL_OPEN: &str = "<|channel|>";
const MESSAGE_OPEN: &str = "<|message|>";
const END: &str = "<|end|>";

pub fn normalize_output(raw: &str) -> String {
    let without_analysis = strip_analysis_blocks(raw);
    strip_control_tokens(without_analysis.trim()).trim().to_string()
}

/// Remove every `<|channel|> analysis <|message|> … <|end|>` block.
fn strip_analysis_blocks(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find(CHANNEL_OPEN) {
        let after_channel = &rest[start + CHANNEL_OPEN.len()..];
        let Some(msg_at) = after_channel.find(MESSAGE_OPEN) else {
            break;
        };
        if after_channel[..msg_at].trim() != "analysis" {
            // Not an analysis header: keep it and continue scanning past it.
            out.push_str(&rest[..start + CHANNEL_OPEN.len()]);
            rest = after_channel;
            continue;
        }
        let body = &after_channel[msg_at + MESSAGE_OPEN.len()..];
        let Some(end_at) = body.find(END) else {
            break;
        };
        out.push_str(&rest[..start]);
        rest = &body[end_at + END.len()..];
    }
    out.push_str(rest);
    out
}

/// Remove `<|name|>` tokens whose name contains no `|`.
fn strip_control_tokens(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find("<|") {
        let after = &rest[start + 2..];
        match after.find('|') {
            Some(bar) if after[bar..].starts_with("|>") => {
                out.push_str(&rest[..start]);
                rest = &after[bar + 2..];
            }
            _ => {
                out.push_str(&rest[..start + 2]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
