//! Convenient re-exports for downstream crates.

pub use crate::config::{InferenceConfig, ScientistConfig};
pub use crate::error::{Error, Result};
pub use crate::hash::{hash_str, Hash256};
pub use crate::id::{RunId, SessionId, StepId};
pub use crate::manifest::RunManifest;
pub use crate::milestone::{Milestone, TOTAL_CALLS};
