//! The four fixed stages of a research run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Milestone {
    #[serde(rename = "M1_IDEATION")]
    Ideation,
    #[serde(rename = "M2_DESIGN")]
    Design,
    #[serde(rename = "M3_ANALYSIS")]
    Analysis,
    #[serde(rename = "M4_WRITING")]
    Writing,
}

impl Milestone {
    /// Execution order.
    pub const ALL: [Milestone; 4] = [
        Milestone::Ideation,
        Milestone::Design,
        Milestone::Analysis,
        Milestone::Writing,
    ];

    /// Zero-based position in [`Milestone::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Milestone::Ideation => 0,
            Milestone::Design => 1,
            Milestone::Analysis => 2,
            Milestone::Writing => 3,
        }
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    /// Number of backend calls a successful milestone issues.
    pub const fn expected_calls(self) -> usize {
        match self {
            Milestone::Ideation => 4,
            Milestone::Design => 2,
            Milestone::Analysis => 1,
            Milestone::Writing => 1,
        }
    }

    /// Stable tag used in status payloads and exported trails.
    pub const fn as_str(self) -> &'static str {
        match self {
            Milestone::Ideation => "M1_IDEATION",
            Milestone::Design => "M2_DESIGN",
            Milestone::Analysis => "M3_ANALYSIS",
            Milestone::Writing => "M4_WRITING",
        }
    }
}

/// Total calls in a successful run (4 + 2 + 1 + 1).
pub const TOTAL_CALLS: usize = 8;

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Milestone {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "M1_IDEATION" | "IDEATION" | "M1" => Ok(Milestone::Ideation),
            "M2_DESIGN" | "DESIGN" | "M2" => Ok(Milestone::Design),
            "M3_ANALYSIS" | "ANALYSIS" | "M3" => Ok(Milestone::Analysis),
            "M4_WRITING" | "WRITING" | "M4" => Ok(Milestone::Writing),
            _ => Err(Error::Milestone(s.to_string())),
        }
    }
}
