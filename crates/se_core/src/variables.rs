//! Shared policy domains for the evaluation engine.
//!
//! Tie-break behavior and the all-votes-zero corner are electoral-rule
//! configuration, not incidental iteration order; both are explicit enums
//! that callers must choose.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How exactly-equal quotients/remainders are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TiePolicy {
    /// First in canonical order (explicit order slice, else ascending key).
    DeterministicOrder,
    /// Drawing of lots via the seeded `TieRng` stream.
    Random,
}

impl Default for TiePolicy {
    fn default() -> Self {
        TiePolicy::DeterministicOrder
    }
}

/// Policy for a vote vector that sums to zero while seats remain to award.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ZeroVotePolicy {
    /// Refuse to allocate (default: seats cannot be earned without votes).
    Fail,
    /// Deterministic round-robin split in canonical order.
    SplitEvenly,
}

impl Default for ZeroVotePolicy {
    fn default() -> Self {
        ZeroVotePolicy::Fail
    }
}
