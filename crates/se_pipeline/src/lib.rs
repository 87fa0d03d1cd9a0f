//! se_pipeline — the composable evaluation engine.
//!
//! Leaf evaluators wrap the pure primitives from `se_algo`; combinators
//! reshape data (flatten/merge/filter) around child evaluators or fan an
//! evaluator out over each branch of a nested mapping. Everything composes
//! through one small capability per role:
//!
//! - [`Distributor`] — structured votes + a seat total → structured seats
//! - [`Selector`] — structured votes + a winner count → ordered winners
//! - [`Eliminator`] — flat totals → the admitted candidate subset
//!
//! Prior-stage results travel through [`StageContext`] as an explicit
//! parameter, never through shared mutable state. Combinators do not catch
//! and paper over child failures; errors carry the region/stage they
//! happened in.

#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use se_core::{Candidate, CoreError, RegionId, Seats, Votes};
use se_algo::AllocError;

pub mod compose;
pub mod convert;
pub mod eval;
pub mod leveling;
pub mod multistage;
pub mod thresholds;

pub use compose::{ByConstituency, ByParty, Conditioned, FixedSeatCount, PostConverted, PreConverted, RegionSeats};
pub use convert::{merged_distributions, vote_totals};
pub use eval::{ApportionScheme, HighestAverages, IntoDistribution, LargestRemainder, Plurality};
pub use leveling::{LevelOutcome, OverhangLeveler, ProbeState};
pub use multistage::MultistageDistributor;
pub use thresholds::{
    AbsoluteThreshold, AnyOf, MemberCountBracketer, PreviousGains, RelativeThreshold,
};

/// Single error surface for composed evaluations.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("invalid input: {0}")]
    Invalid(&'static str),

    #[error("shape: {0}")]
    Shape(#[from] CoreError),

    #[error("stage expects nesting depth {expected}, input has depth {actual}")]
    DepthMismatch { expected: usize, actual: usize },

    #[error("no prior-stage result available for a previous-gain threshold")]
    MissingPreviousStage,

    #[error("no threshold bracket for member count {member_count} and no default")]
    MissingBracket { member_count: usize },

    #[error("overhang leveling requires a seat-monotonic (divisor) apportionment")]
    NonMonotonicLeveling,

    #[error("overhang leveling did not converge within {probes} probes")]
    NonConvergence { probes: u32 },

    #[error("allocation: {0}")]
    Allocation(#[from] AllocError),

    #[error("in region {region}: {source}")]
    InRegion {
        region: RegionId,
        #[source]
        source: Box<EvalError>,
    },

    #[error("in stage {stage}: {source}")]
    InStage {
        stage: usize,
        #[source]
        source: Box<EvalError>,
    },
}

impl EvalError {
    /// Wrap with the region the failure happened in.
    pub(crate) fn in_region(self, region: &RegionId) -> EvalError {
        EvalError::InRegion {
            region: region.clone(),
            source: Box::new(self),
        }
    }

    /// Wrap with the (zero-based) stage index the failure happened in.
    pub(crate) fn in_stage(self, stage: usize) -> EvalError {
        EvalError::InStage {
            stage,
            source: Box::new(self),
        }
    }
}

/// Explicit side channel for results carried over from an earlier stage
/// (e.g. first-round constituency wins feeding a "won at least N seats"
/// threshold or the overhang floor). Passed alongside votes; combinators
/// narrow it per region when they descend into nested data.
#[derive(Debug, Clone, Default)]
pub struct StageContext {
    pub previous: Option<Seats>,
}

impl StageContext {
    pub fn with_previous(previous: Seats) -> Self {
        StageContext {
            previous: Some(previous),
        }
    }

    /// Context for one region: the matching subtree of `previous`, if any.
    pub fn narrowed(&self, region: &RegionId) -> StageContext {
        let previous = match &self.previous {
            Some(Seats::ByRegion(m)) => m.get(region).cloned(),
            // A flat carry-over does not subdivide; drop it rather than
            // let every region see the national totals as its own.
            _ => None,
        };
        StageContext { previous }
    }
}

/// Takes structured votes and a requested seat total; returns structured
/// seats whose grand total equals the request. One operation, implemented
/// by every primitive and every combinator, so trees of arbitrary depth
/// compose uniformly.
pub trait Distributor: Send + Sync {
    fn evaluate(&self, votes: &Votes, seats: u32, ctx: &StageContext) -> Result<Seats, EvalError>;
}

/// Picks an ordered winner list (no seat-count semantics attached).
pub trait Selector: Send + Sync {
    fn select(
        &self,
        votes: &Votes,
        seats: u32,
        ctx: &StageContext,
    ) -> Result<Vec<Candidate>, EvalError>;
}

/// Threshold predicate over flat totals: returns the admitted subset.
/// Exclusion is destructive: whoever is dropped gets zero seats at the
/// stage that applied the filter.
pub trait Eliminator: Send + Sync {
    fn admit(
        &self,
        scores: &BTreeMap<Candidate, u64>,
        total: u128,
        ctx: &StageContext,
    ) -> Result<BTreeSet<Candidate>, EvalError>;
}

impl<D: Distributor + ?Sized> Distributor for Box<D> {
    fn evaluate(&self, votes: &Votes, seats: u32, ctx: &StageContext) -> Result<Seats, EvalError> {
        (**self).evaluate(votes, seats, ctx)
    }
}

impl<S: Selector + ?Sized> Selector for Box<S> {
    fn select(
        &self,
        votes: &Votes,
        seats: u32,
        ctx: &StageContext,
    ) -> Result<Vec<Candidate>, EvalError> {
        (**self).select(votes, seats, ctx)
    }
}

impl<E: Eliminator + ?Sized> Eliminator for Box<E> {
    fn admit(
        &self,
        scores: &BTreeMap<Candidate, u64>,
        total: u128,
        ctx: &StageContext,
    ) -> Result<BTreeSet<Candidate>, EvalError> {
        (**self).admit(scores, total, ctx)
    }
}
