//! The fixed call plan: which action runs in which milestone, in order.

use serde::Serialize;

use verisci_core::milestone::Milestone;

use crate::program::NUM_HYPOTHESES;
use crate::prompts::actions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlannedCall {
    /// 1-based; equals the step id the call is logged under.
    pub step: u64,
    pub milestone: Milestone,
    pub action: &'static str,
}

/// All eight calls of a successful run.
pub fn call_plan() -> Vec<PlannedCall> {
    let mut calls: Vec<(Milestone, &'static str)> = Vec::with_capacity(8);
    for _ in 0..NUM_HYPOTHESES {
        calls.push((Milestone::Ideation, actions::GENERATE_HYPOTHESIS));
    }
    calls.push((Milestone::Ideation, actions::RANK_NOVELTY));
    calls.push((Milestone::Design, actions::DESIGN_EXPERIMENT));
    calls.push((Milestone::Design, actions::GENERATE_CODE));
    calls.push((Milestone::Analysis, actions::ANALYZE_RESULTS));
    calls.push((Milestone::Writing, actions::WRITE_ABSTRACT));

    calls
        .into_iter()
        .enumerate()
        .map(|(i, (milestone, action))| PlannedCall {
            step: i as u64 + 1,
            milestone,
            action,
        })
        .collect()
}
