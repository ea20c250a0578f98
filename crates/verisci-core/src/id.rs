//! Strongly-typed identifiers used across the pipeline.
//!
//! Downstream crates (audit, exec, cli) should *not* pass raw integers or
//! strings around for IDs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! new_id {
    ($name:ident, $prefix:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(v: u64) -> Self {
                Self(v)
            }
            pub const fn get(self) -> u64 {
                self.0
            }
            pub const fn checked_next(self) -> Option<Self> {
                match self.0.checked_add(1) {
                    Some(v) => Some(Self(v)),
                    None => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{:03}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = crate::error::Error;

            /// Accepts both the bare ordinal (`3`) and the display form (`step-003`).
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.trim();
                let digits = raw
                    .strip_prefix(concat!($prefix, "-"))
                    .unwrap_or(raw);
                digits
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|e| crate::error::Error::Config(format!("bad {} '{s}': {e}", $prefix)))
            }
        }
    };
}

new_id!(StepId, "step");

macro_rules! new_uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

new_uuid_id!(RunId);
new_uuid_id!(SessionId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_id_display_and_parse() {
        let id = StepId::new(7);
        assert_eq!(id.to_string(), "step-007");
        assert_eq!("step-007".parse::<StepId>().unwrap(), id);
        assert_eq!("7".parse::<StepId>().unwrap(), id);
        assert!("seven".parse::<StepId>().is_err());
    }

    #[test]
    fn step_ids_order_by_ordinal() {
        assert!(StepId::new(1) < StepId::new(2));
        assert_eq!(StepId::new(1).checked_next(), Some(StepId::new(2)));
        assert_eq!(StepId::new(u64::MAX).checked_next(), None);
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::random(), RunId::random());
    }
}
