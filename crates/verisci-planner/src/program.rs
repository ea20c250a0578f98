//! Research program definition and its YAML form.
//!
//! Example:
//! ```yaml
//! topic: "Robust policy improvement for offline RL"
//! seed: 42
//! model: gpt-oss-120b-f16
//! ```
//! `seed` and `model` are optional and fall back to the caller's config.

use serde::{Deserialize, Serialize};

use verisci_core::config::ScientistConfig;
use verisci_core::hash::{hash_str, Hash256};

use crate::error::{PlanError, Result};

/// Candidate hypotheses generated in ideation.
pub const NUM_HYPOTHESES: usize = 3;

/// The research program, fixed for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchProgram {
    pub topic: String,
    pub seed: u64,
    pub model: String,
}

impl ResearchProgram {
    pub fn new(topic: impl Into<String>, seed: u64, model: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            seed,
            model: model.into(),
        }
    }

    /// Program with the config's default seed and model.
    pub fn from_config(topic: impl Into<String>, cfg: &ScientistConfig) -> Self {
        Self::new(topic, cfg.seed, cfg.model.clone())
    }

    /// Digest of the topic, recorded in the run manifest.
    pub fn program_hash(&self) -> Hash256 {
        hash_str(&self.topic)
    }

    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(PlanError::Invalid("topic must not be empty".into()));
        }
        if self.model.trim().is_empty() {
            return Err(PlanError::Invalid("model must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProgramDoc {
    topic: String,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    model: Option<String>,
}

/// Parse a YAML program, filling gaps from `cfg`.
pub fn parse_yaml_program(src: &str, cfg: &ScientistConfig) -> Result<ResearchProgram> {
    let doc: ProgramDoc = serde_yaml::from_str(src)?;
    let program = ResearchProgram {
        topic: doc.topic.trim().to_string(),
        seed: doc.seed.unwrap_or(cfg.seed),
        model: doc.model.unwrap_or_else(|| cfg.model.clone()),
    };
    program.validate()?;
    Ok(program)
}
