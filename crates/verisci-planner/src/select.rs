//! Novelty scores → selected hypothesis.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::extract::extract_json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Index into the generated hypotheses.
    pub index: usize,
    /// One score per hypothesis; missing or unreadable scores are 0.
    pub scores: Vec<f64>,
    /// False when the ranking output held no readable score list.
    pub parsed: bool,
}

/// Read `n` scores from a ranking response.
///
/// Accepted shapes: `{"scores": [7, 9, 4]}`, a bare array `[7, 9, 4]`, or an
/// array of objects carrying a `score` field. Entries beyond `n` are ignored;
/// missing entries count as 0.
pub fn parse_scores(raw: &str, n: usize) -> (Vec<f64>, bool) {
    let list = match extract_json(raw) {
        Some(Value::Object(mut map)) => match map.remove("scores") {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        Some(Value::Array(items)) => Some(items),
        _ => None,
    };

    let Some(items) = list else {
        return (vec![0.0; n], false);
    };

    let mut scores: Vec<f64> = items.iter().take(n).map(score_of).collect();
    scores.resize(n, 0.0);
    (scores, true)
}

fn score_of(v: &Value) -> f64 {
    let raw = match v {
        Value::Object(map) => map.get("score").and_then(Value::as_f64),
        other => other.as_f64(),
    };
    raw.filter(|s| s.is_finite()).unwrap_or(0.0)
}

/// Index of the highest score; ties go to the earliest. Empty input → 0.
pub fn select_best(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, s) in scores.iter().enumerate() {
        if *s > scores[best] {
            best = i;
        }
    }
    best
}

/// Parse a ranking response and pick the winner.
pub fn select_from_ranking(raw: &str, n: usize) -> Selection {
    let (scores, parsed) = parse_scores(raw, n);
    if !parsed {
        tracing::warn!(
            hypotheses = n,
            "ranking output held no readable scores; falling back to the first hypothesis"
        );
    }
    Selection {
        index: select_best(&scores),
        scores,
        parsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_score_wins() {
        assert_eq!(select_best(&[3.0, 8.0, 5.0]), 1);
    }

    #[test]
    fn ties_go_to_earliest() {
        assert_eq!(select_best(&[7.0, 9.0, 9.0]), 1);
        assert_eq!(select_best(&[5.0, 5.0, 5.0]), 0);
        assert_eq!(select_best(&[]), 0);
    }

    #[test]
    fn parses_scores_object() {
        let (s, ok) = parse_scores("{\"scores\": [6, 8.5, 2], \"reasoning\": \"…\"}", 3);
        assert!(ok);
        assert_eq!(s, vec![6.0, 8.5, 2.0]);
    }

    #[test]
    fn parses_array_of_objects() {
        let (s, ok) = parse_scores("[{\"score\": 4}, {\"score\": 9}, {\"oops\": 1}]", 3);
        assert!(ok);
        assert_eq!(s, vec![4.0, 9.0, 0.0]);
    }

    #[test]
    fn short_lists_are_padded() {
        let (s, ok) = parse_scores("[5]", 3);
        assert!(ok);
        assert_eq!(s, vec![5.0, 0.0, 0.0]);
    }

    #[test]
    fn unreadable_output_selects_first() {
        let sel = select_from_ranking("I think the second one is best.", 3);
        assert!(!sel.parsed);
        assert_eq!(sel.index, 0);
        assert_eq!(sel.scores, vec![0.0; 3]);
    }
}
