//! Execution tiers and the transitions between them.

use serde::{Deserialize, Serialize};

/// Execution tier selecting which implementation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Reference implementation. Every dispatcher starts here.
    #[default]
    Baseline,
    /// Faster alternative, selected after sustained slow baseline calls.
    Accelerated,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Baseline => write!(f, "baseline"),
            Self::Accelerated => write!(f, "accelerated"),
        }
    }
}

/// Direction of a tier change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Baseline to Accelerated.
    Promote,
    /// Accelerated to Baseline.
    Demote,
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Promote => write!(f, "promote"),
            Self::Demote => write!(f, "demote"),
        }
    }
}

/// A single tier change decided by the policy.
///
/// Only [`Transition::promote`] and [`Transition::demote`] construct one, so
/// `kind`, `from` and `to` always agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    kind: TransitionKind,
    from: Tier,
    to: Tier,
}

impl Transition {
    pub fn promote() -> Self {
        Self {
            kind: TransitionKind::Promote,
            from: Tier::Baseline,
            to: Tier::Accelerated,
        }
    }

    pub fn demote() -> Self {
        Self {
            kind: TransitionKind::Demote,
            from: Tier::Accelerated,
            to: Tier::Baseline,
        }
    }

    pub fn kind(&self) -> TransitionKind {
        self.kind
    }

    pub fn from(&self) -> Tier {
        self.from
    }

    pub fn to(&self) -> Tier {
        self.to
    }
}
