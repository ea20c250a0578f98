//! Prompt text for every backend call.
//!
//! The stored prompt is exactly the text sent to the backend, so each builder
//! embeds whatever upstream output it depends on verbatim. Builders are pure:
//! identical inputs always give identical prompts.

use serde_json::Value;

use crate::extract::extract_object;

/// Call names recorded in the audit trail.
pub mod actions {
    pub const GENERATE_HYPOTHESIS: &str = "generate_hypothesis";
    pub const RANK_NOVELTY: &str = "rank_novelty";
    pub const DESIGN_EXPERIMENT: &str = "design_experiment";
    pub const GENERATE_CODE: &str = "generate_code";
    pub const ANALYZE_RESULTS: &str = "analyze_results";
    pub const WRITE_ABSTRACT: &str = "write_abstract";
}

const JSON_ONLY: &str = "Output ONLY the JSON. Do not include reasoning, explanation, or markdown.";
const TITLE_MAX_CHARS: usize = 120;

/// Ideation: one hypothesis per call. Earlier titles are listed so the three
/// candidates differ.
pub fn hypothesis(topic: &str, index: usize, total: usize, previous_titles: &[String]) -> String {
    let mut p = format!(
        "You are an expert AI research scientist generating novel, testable research hypotheses.\n\
         Topic: {topic}\n\
         Produce hypothesis {n} of {total}.\n",
        n = index + 1,
    );
    if !previous_titles.is_empty() {
        p.push_str("It must differ substantially from these earlier hypotheses:\n");
        for (i, t) in previous_titles.iter().enumerate() {
            p.push_str(&format!("{}. {}\n", i + 1, t));
        }
    }
    p.push_str(
        "Respond with a JSON object with keys: \"title\", \"description\", \"novelty\", \
         \"testable_prediction\", \"experiment_sketch\", \"risk\".\n",
    );
    p.push_str(JSON_ONLY);
    p
}

/// Ideation: score all candidates in one call.
pub fn novelty_ranking(topic: &str, hypotheses: &[String]) -> String {
    let mut p = format!(
        "You are a research novelty assessor.\n\
         Topic: {topic}\n\
         Score each of the following {} hypotheses for novelty on a 1-10 scale.\n\n",
        hypotheses.len()
    );
    for (i, h) in hypotheses.iter().enumerate() {
        p.push_str(&format!("### Hypothesis {}\n{}\n\n", i + 1, h));
    }
    p.push_str(
        "Respond with a JSON object: {\"scores\": [one number per hypothesis, in order], \
         \"reasoning\": str, \"related_work\": [str]}.\n",
    );
    p.push_str(JSON_ONLY);
    p
}

/// Design: full experiment design for the selected hypothesis.
pub fn experiment_design(topic: &str, hypothesis: &str) -> String {
    format!(
        "You are an ML experiment designer. Design a rigorous experiment to test this hypothesis.\n\
         Topic: {topic}\n\n\
         ### Hypothesis\n{hypothesis}\n\n\
         Respond with a JSON object with keys: \"method\", \"baselines\", \"datasets\", \"metrics\", \
         \"hyperparameters\", \"ablations\", \"compute_estimate_gpu_hours\", \"expected_results\".\n\
         {JSON_ONLY}"
    )
}

/// Design: implementation of the design. The design text is embedded verbatim.
pub fn implementation(design: &str) -> String {
    format!(
        "You are an expert ML engineer. Write a complete, runnable, self-contained Python \
         experiment script (PyTorch) implementing the design below: training loop, evaluation, \
         and results printed as JSON to stdout. Output only the code.\n\n\
         ### Experiment design\n{design}\n"
    )
}

/// Analysis: significance judgment over the design and declared results.
pub fn analysis(hypothesis: &str, design: &str, results: &Value) -> String {
    format!(
        "You are a rigorous ML researcher analyzing experiment results. Decide whether the \
         hypothesis is supported and whether the effect is statistically significant. Be honest: \
         if the results do not support the hypothesis, say so.\n\n\
         ### Hypothesis\n{hypothesis}\n\n\
         ### Experiment design\n{design}\n\n\
         ### Results\n{results}\n\n\
         Respond with a JSON object: {{\"verdict\": str, \"significant\": bool, \"confidence\": float, \
         \"key_findings\": [str], \"limitations\": [str], \"follow_ups\": [str]}}.\n\
         {JSON_ONLY}",
        results = canonical_json(results),
    )
}

/// Writing: abstract citing concrete numbers from upstream outputs.
pub fn write_abstract(
    topic: &str,
    hypothesis: &str,
    design: &str,
    results: &Value,
    analysis: &str,
) -> String {
    format!(
        "You are an academic paper writer. Write a concise abstract (under 250 words) \
         structured as context, problem, method, results, impact. Cite the concrete metrics \
         below by value.\n\
         Topic: {topic}\n\n\
         ### Hypothesis\n{hypothesis}\n\n\
         ### Experiment design\n{design}\n\n\
         ### Results\n{results}\n\n\
         ### Analysis\n{analysis}\n",
        results = canonical_json(results),
    )
}

/// Title of a generated hypothesis: its JSON `title`, else its first
/// non-empty line.
pub fn hypothesis_title(output: &str) -> String {
    let from_json = extract_object(output)
        .and_then(|m| m.get("title").and_then(Value::as_str).map(str::to_string));
    let title = from_json.unwrap_or_else(|| {
        output
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("(untitled)")
            .to_string()
    });
    match title.char_indices().nth(TITLE_MAX_CHARS) {
        Some((idx, _)) => title[..idx].to_string(),
        None => title,
    }
}

fn canonical_json(v: &Value) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::declared_results;

    #[test]
    fn prompts_are_pure() {
        let a = hypothesis("t", 1, 3, &["first".into()]);
        let b = hypothesis("t", 1, 3, &["first".into()]);
        assert_eq!(a, b);
        assert!(a.contains("hypothesis 2 of 3"));
        assert!(a.contains("1. first"));
    }

    #[test]
    fn first_hypothesis_has_no_exclusion_list() {
        let p = hypothesis("t", 0, 3, &[]);
        assert!(!p.contains("differ substantially"));
    }

    #[test]
    fn ranking_lists_every_candidate_in_order() {
        let hs = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
        let p = novelty_ranking("t", &hs);
        let a = p.find("alpha").unwrap();
        let b = p.find("beta").unwrap();
        let g = p.find("gamma").unwrap();
        assert!(a < b && b < g);
        assert!(p.contains("\"scores\""));
    }

    #[test]
    fn implementation_embeds_design_verbatim() {
        let design = "{\"method\": \"x\"}\nline two";
        assert!(implementation(design).contains(design));
    }

    #[test]
    fn downstream_prompts_embed_upstream_text() {
        let results = declared_results();
        let a = analysis("H", "D", &results);
        assert!(a.contains("### Hypothesis\nH\n"));
        assert!(a.contains("### Experiment design\nD\n"));
        assert!(a.contains("178.9"));

        let w = write_abstract("T", "H", "D", &results, "ANALYSIS TEXT");
        assert!(w.contains("ANALYSIS TEXT"));
        assert!(w.contains("0.84"));
    }

    #[test]
    fn titles_prefer_json_field() {
        assert_eq!(hypothesis_title("{\"title\": \"Sparse critics\"}"), "Sparse critics");
        assert_eq!(hypothesis_title("\n\nPlain heading\nbody"), "Plain heading");
        assert_eq!(hypothesis_title(""), "(untitled)");
        assert_eq!(hypothesis_title(&"x".repeat(500)).len(), TITLE_MAX_CHARS);
    }
}
