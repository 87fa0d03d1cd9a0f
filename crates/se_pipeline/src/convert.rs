//! Shape conversions used by the pre/post adapters in [`crate::compose`].

use se_core::{Seats, Votes};

use crate::EvalError;

/// Collapses a regional vote tree into a single nationwide tally.
/// Per-candidate counts saturate rather than wrap.
pub fn vote_totals(votes: &Votes) -> Result<Votes, EvalError> {
    Ok(Votes::Flat(votes.flattened()))
}

/// Collapses a regional seat result into nationwide per-candidate totals.
pub fn merged_distributions(seats: Seats) -> Result<Seats, EvalError> {
    Ok(Seats::Flat(seats.merged()))
}
