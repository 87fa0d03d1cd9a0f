//! Leaf evaluators: thin `Distributor`/`Selector` wrappers around the pure
//! primitives in `se_algo`. Tie policy, zero-vote policy, canonical order,
//! and the tie seed are evaluator configuration fixed at construction.

use std::collections::BTreeMap;

use se_algo::{AllocError, DivisorMethod, QuotaMethod};
use se_core::rng::{tie_rng_from_seed, TieRng};
use se_core::{Candidate, Seats, TiePolicy, Votes, ZeroVotePolicy};

use crate::{Distributor, EvalError, Selector, StageContext};

/// Apportionment family used by sub-allocation steps (`ByParty`, region
/// seat apportionment, overhang leveling). Divisor methods are monotonic
/// in the seat total; largest remainder is not, which matters to leveling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApportionScheme {
    Divisor(DivisorMethod),
    LargestRemainder(QuotaMethod),
}

impl ApportionScheme {
    /// Growing the seat total never shrinks any allocation? True only for
    /// divisor methods (largest remainder admits the Alabama paradox).
    #[inline]
    pub fn is_seat_monotonic(self) -> bool {
        matches!(self, ApportionScheme::Divisor(_))
    }

    /// Run the scheme over arbitrary keys with deterministic tie-breaking.
    pub fn apportion<K: Ord + Clone>(
        self,
        seats: u32,
        scores: &BTreeMap<K, u64>,
        order: Option<&[K]>,
    ) -> Result<BTreeMap<K, u32>, AllocError> {
        match self {
            ApportionScheme::Divisor(method) => se_algo::highest_averages(
                seats,
                scores,
                order,
                method,
                TiePolicy::DeterministicOrder,
                ZeroVotePolicy::Fail,
                None,
            ),
            ApportionScheme::LargestRemainder(quota) => {
                se_algo::largest_remainder(seats, scores, order, quota)
            }
        }
    }
}

/// Highest-averages (divisor) proportional evaluator over a flat mapping.
#[derive(Debug, Clone)]
pub struct HighestAverages {
    method: DivisorMethod,
    tie_policy: TiePolicy,
    zero_votes: ZeroVotePolicy,
    tie_seed: u64,
    order: Option<Vec<Candidate>>,
}

impl HighestAverages {
    pub fn new(method: DivisorMethod) -> Self {
        HighestAverages {
            method,
            tie_policy: TiePolicy::DeterministicOrder,
            zero_votes: ZeroVotePolicy::Fail,
            tie_seed: 0,
            order: None,
        }
    }

    /// Break exact quotient ties by drawing of lots with this seed.
    pub fn with_random_ties(mut self, seed: u64) -> Self {
        self.tie_policy = TiePolicy::Random;
        self.tie_seed = seed;
        self
    }

    pub fn with_zero_vote_policy(mut self, policy: ZeroVotePolicy) -> Self {
        self.zero_votes = policy;
        self
    }

    /// Fix the canonical scan/tie order explicitly.
    pub fn with_order(mut self, order: Vec<Candidate>) -> Self {
        self.order = Some(order);
        self
    }

    fn rng(&self) -> Option<TieRng> {
        matches!(self.tie_policy, TiePolicy::Random).then(|| tie_rng_from_seed(self.tie_seed))
    }
}

impl Distributor for HighestAverages {
    fn evaluate(&self, votes: &Votes, seats: u32, _ctx: &StageContext) -> Result<Seats, EvalError> {
        let flat = votes.as_flat()?;
        let mut rng = self.rng();
        let alloc = se_algo::highest_averages(
            seats,
            flat,
            self.order.as_deref(),
            self.method,
            self.tie_policy,
            self.zero_votes,
            rng.as_mut(),
        )?;
        Ok(Seats::Flat(alloc))
    }
}

/// Largest-remainder proportional evaluator over a flat mapping.
#[derive(Debug, Clone)]
pub struct LargestRemainder {
    quota: QuotaMethod,
    order: Option<Vec<Candidate>>,
}

impl LargestRemainder {
    pub fn new(quota: QuotaMethod) -> Self {
        LargestRemainder { quota, order: None }
    }

    pub fn with_order(mut self, order: Vec<Candidate>) -> Self {
        self.order = Some(order);
        self
    }
}

impl Distributor for LargestRemainder {
    fn evaluate(&self, votes: &Votes, seats: u32, _ctx: &StageContext) -> Result<Seats, EvalError> {
        let flat = votes.as_flat()?;
        let alloc = se_algo::largest_remainder(seats, flat, self.order.as_deref(), self.quota)?;
        Ok(Seats::Flat(alloc))
    }
}

/// Plurality winner selection (single- or few-winner contests).
#[derive(Debug, Clone, Default)]
pub struct Plurality {
    tie_policy: TiePolicy,
    tie_seed: u64,
    order: Option<Vec<Candidate>>,
}

impl Plurality {
    pub fn new() -> Self {
        Plurality::default()
    }

    pub fn with_random_ties(mut self, seed: u64) -> Self {
        self.tie_policy = TiePolicy::Random;
        self.tie_seed = seed;
        self
    }

    pub fn with_order(mut self, order: Vec<Candidate>) -> Self {
        self.order = Some(order);
        self
    }
}

impl Selector for Plurality {
    fn select(
        &self,
        votes: &Votes,
        seats: u32,
        _ctx: &StageContext,
    ) -> Result<Vec<Candidate>, EvalError> {
        let flat = votes.as_flat()?;
        let mut rng =
            matches!(self.tie_policy, TiePolicy::Random).then(|| tie_rng_from_seed(self.tie_seed));
        let winners = se_algo::plurality_winners(
            seats,
            flat,
            self.order.as_deref(),
            self.tie_policy,
            rng.as_mut(),
        )?;
        Ok(winners)
    }
}

/// Lift a selection into seat-shaped data: one seat per winner.
pub struct IntoDistribution<S: Selector>(pub S);

impl<S: Selector> Distributor for IntoDistribution<S> {
    fn evaluate(&self, votes: &Votes, seats: u32, ctx: &StageContext) -> Result<Seats, EvalError> {
        let winners = self.0.select(votes, seats, ctx)?;
        let mut out: BTreeMap<Candidate, u32> = BTreeMap::new();
        for w in winners {
            *out.entry(w).or_insert(0) += 1;
        }
        Ok(Seats::Flat(out))
    }
}
