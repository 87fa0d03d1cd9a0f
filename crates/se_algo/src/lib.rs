//! se_algo — pure apportionment, threshold, and selection primitives.
//!
//! Everything here is a deterministic function over immutable inputs:
//! integer-first math, canonical-order scans, explicit tie policies.
//! Primitives are generic over the key type so one divisor apportionment
//! serves candidate votes, per-region population splits, and per-party
//! regional list allocation alike. Depends only on `se_core`.

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use core::fmt;

// ----------------------------- Allocation (public surface) ---------------------------

pub mod allocation {
    pub mod highest_averages;
    pub mod largest_remainder;

    pub use self::highest_averages::{highest_averages, DivisorMethod};
    pub use self::largest_remainder::{largest_remainder, QuotaMethod};
}

pub mod selection;
pub mod thresholds;

// Tight, explicit re-exports (avoid wildcard export drift).
pub use allocation::{highest_averages, largest_remainder, DivisorMethod, QuotaMethod};
pub use selection::plurality_winners;
pub use thresholds::{admitted_by_count, admitted_by_fraction};

/// Shared error surface of the allocation/selection primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// Empty candidate set while seats > 0.
    NoCandidates,
    /// Every candidate has zero votes and policy says refuse.
    AllVotesZero,
    /// Policy was Random but no RNG was supplied (and seats > 0).
    MissingRngForRandomPolicy,
    /// Closed invariant broken: awarded total ≠ requested total.
    /// Always an internal defect, never silently corrected.
    TotalMismatch { awarded: u128, requested: u128 },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::NoCandidates => write!(f, "no candidates while seats requested"),
            AllocError::AllVotesZero => write!(f, "all candidates have zero votes"),
            AllocError::MissingRngForRandomPolicy => {
                write!(f, "random tie policy requires an RNG")
            }
            AllocError::TotalMismatch { awarded, requested } => write!(
                f,
                "allocation inconsistency: awarded {awarded} seats, requested {requested}"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AllocError {}
