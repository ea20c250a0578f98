//! Tolerant JSON extraction from model output.
//!
//! Models wrap JSON in markdown fences or prose. Try, in order: the whole
//! (unfenced) text, then balanced `[...]` / `{...}` spans found by a
//! string-aware bracket scan, whichever bracket opens first.

use serde_json::Value;

pub fn extract_json(raw: &str) -> Option<Value> {
    let clean = strip_fences(raw.trim());

    if let Ok(v) = serde_json::from_str::<Value>(clean) {
        return Some(v);
    }

    let mut brackets = [('[', ']'), ('{', '}')];
    brackets.sort_by_key(|(open, _)| clean.find(*open).unwrap_or(usize::MAX));
    for (open, close) in brackets {
        if let Some(candidate) = balanced_span(clean, open, close) {
            if let Ok(v) = serde_json::from_str::<Value>(candidate) {
                return Some(v);
            }
        }
    }
    None
}

/// Extract a JSON object: an object as-is, or the first object inside an array.
pub fn extract_object(raw: &str) -> Option<serde_json::Map<String, Value>> {
    match extract_json(raw)? {
        Value::Object(map) => Some(map),
        Value::Array(items) => items.into_iter().find_map(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        }),
        _ => None,
    }
}

fn strip_fences(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // Drop the info string (```json) line.
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    match body.rfind("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// First span starting at `open` whose brackets balance, ignoring brackets in
/// JSON strings.
fn balanced_span(s: &str, open: char, close: char) -> Option<&str> {
    let start = s.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;

    for (i, c) in s[start..].char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match c {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            _ if in_string => {}
            c if c == open => depth += 1,
            c if c == close => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&s[start..start + i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_plain_json() {
        assert_eq!(extract_json("{\"a\": 1}"), Some(json!({"a": 1})));
    }

    #[test]
    fn strips_markdown_fences() {
        let raw = "```json\n{\"scores\": [1, 2, 3]}\n```";
        assert_eq!(extract_json(raw), Some(json!({"scores": [1, 2, 3]})));
    }

    #[test]
    fn finds_object_inside_prose() {
        let raw = "Sure! Here is the ranking: {\"scores\": [4, 9, 9], \"note\": \"a } in text\"} hope it helps";
        assert_eq!(
            extract_json(raw),
            Some(json!({"scores": [4, 9, 9], "note": "a } in text"}))
        );
    }

    #[test]
    fn earliest_bracket_wins() {
        let raw = "list: [{\"title\": \"x\"}] trailing";
        assert_eq!(extract_json(raw), Some(json!([{"title": "x"}])));
    }

    #[test]
    fn object_from_array() {
        let raw = "[1, {\"score\": 5}]";
        let obj = extract_object(raw).unwrap();
        assert_eq!(obj.get("score"), Some(&json!(5)));
    }

    #[test]
    fn no_json_is_none() {
        assert_eq!(extract_json("no structured output here"), None);
        assert_eq!(extract_json("{ unbalanced"), None);
    }
}
