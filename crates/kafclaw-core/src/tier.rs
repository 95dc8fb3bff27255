//! Tool tiers — the integer severity scale the policy engine arbitrates on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a tool's side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Read-only: no observable side effect outside the agent.
    Read,
    /// Write: mutates state the user or other agents can observe.
    Write,
    /// High-risk: broad, hard-to-reverse, or externally visible effects.
    HighRisk,
}

impl Tier {
    /// Numeric value matching the spec's `tier ∈ {0, 1, 2}`.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Read => 0,
            Self::Write => 1,
            Self::HighRisk => 2,
        }
    }

    /// Build a tier from its numeric value, clamping anything above 2 to
    /// [`Tier::HighRisk`].
    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Read,
            1 => Self::Write,
            _ => Self::HighRisk,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}
