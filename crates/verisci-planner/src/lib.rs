#![forbid(unsafe_code)]
//! verisci-planner: what each of the eight backend calls says, and how their
//! answers are read.
//!
//! - `program`: the research program (topic/seed/model) and its YAML form.
//! - `prompts`: prompt text for every call. Every prompt embeds the upstream
//!   text it depends on verbatim, so a run is reproducible from its audit
//!   trail alone.
//! - `plan`: the fixed eight-call plan per milestone.
//! - `extract`: tolerant JSON extraction from model output.
//! - `select`: novelty scores → selected hypothesis (earliest wins ties).
//! - `results`: the fixed, declared results table fed to analysis/writing.
//!
//! No I/O or backend access here; the exec crate drives it.

pub mod error;
pub mod extract;
pub mod plan;
pub mod program;
pub mod prompts;
pub mod results;
pub mod select;

pub use error::{PlanError, Result};
pub use extract::extract_json;
pub use plan::{call_plan, PlannedCall};
pub use program::{parse_yaml_program, ResearchProgram, NUM_HYPOTHESES};
pub use results::declared_results;
pub use select::{parse_scores, select_best, select_from_ranking, Selection};
