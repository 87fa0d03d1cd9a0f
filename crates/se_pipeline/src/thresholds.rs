//! Threshold/elimination evaluators. Each is a predicate over
//! (flat totals, grand total) returning the admitted candidate subset;
//! excluded candidates are removed entirely before the next stage consumes
//! the mapping.

use std::collections::{BTreeMap, BTreeSet};

use se_core::rounding::Fraction;
use se_core::Candidate;

use crate::{Eliminator, EvalError, StageContext};

/// Admits candidates whose vote share meets a fraction of the total
/// (≥ when `accept_equal`, strictly > otherwise).
#[derive(Debug, Clone, Copy)]
pub struct RelativeThreshold {
    fraction: Fraction,
    accept_equal: bool,
}

impl RelativeThreshold {
    pub fn new(fraction: Fraction, accept_equal: bool) -> Self {
        RelativeThreshold {
            fraction,
            accept_equal,
        }
    }
}

impl Eliminator for RelativeThreshold {
    fn admit(
        &self,
        scores: &BTreeMap<Candidate, u64>,
        total: u128,
        _ctx: &StageContext,
    ) -> Result<BTreeSet<Candidate>, EvalError> {
        Ok(se_algo::admitted_by_fraction(
            scores,
            total,
            self.fraction,
            self.accept_equal,
        ))
    }
}

/// Admits candidates whose value meets an absolute floor. The mapping it
/// judges is whatever the caller hands it, typically a prior-stage seat
/// result threaded in via [`PreviousGains`] ("won at least N seats" rules).
#[derive(Debug, Clone, Copy)]
pub struct AbsoluteThreshold {
    count: u64,
}

impl AbsoluteThreshold {
    pub fn new(count: u64) -> Self {
        AbsoluteThreshold { count }
    }
}

impl Eliminator for AbsoluteThreshold {
    fn admit(
        &self,
        scores: &BTreeMap<Candidate, u64>,
        _total: u128,
        _ctx: &StageContext,
    ) -> Result<BTreeSet<Candidate>, EvalError> {
        Ok(se_algo::admitted_by_count(scores, self.count))
    }
}

/// Substitutes the judged quantity with the result carried over from an
/// earlier evaluation stage (merged to flat counts), then delegates to the
/// wrapped threshold. Errors when no prior-stage result was threaded in.
pub struct PreviousGains<E: Eliminator> {
    inner: E,
}

impl<E: Eliminator> PreviousGains<E> {
    pub fn new(inner: E) -> Self {
        PreviousGains { inner }
    }
}

impl<E: Eliminator> Eliminator for PreviousGains<E> {
    fn admit(
        &self,
        _scores: &BTreeMap<Candidate, u64>,
        _total: u128,
        ctx: &StageContext,
    ) -> Result<BTreeSet<Candidate>, EvalError> {
        let previous = ctx.previous.as_ref().ok_or(EvalError::MissingPreviousStage)?;
        let gains: BTreeMap<Candidate, u64> = previous
            .merged()
            .into_iter()
            .map(|(cand, s)| (cand, s as u64))
            .collect();
        let total: u128 = gains.values().map(|&v| v as u128).sum();
        self.inner.admit(&gains, total, ctx)
    }
}

/// Logical OR over alternatives: admitted by any listed threshold.
/// Satisfies "5% nationwide OR ≥3 constituency seats" rules.
pub struct AnyOf {
    alternatives: Vec<Box<dyn Eliminator>>,
}

impl AnyOf {
    pub fn new(alternatives: Vec<Box<dyn Eliminator>>) -> Self {
        AnyOf { alternatives }
    }
}

impl Eliminator for AnyOf {
    fn admit(
        &self,
        scores: &BTreeMap<Candidate, u64>,
        total: u128,
        ctx: &StageContext,
    ) -> Result<BTreeSet<Candidate>, EvalError> {
        let mut admitted = BTreeSet::new();
        for alt in &self.alternatives {
            admitted.append(&mut alt.admit(scores, total, ctx)?);
        }
        Ok(admitted)
    }
}

/// Dispatches each candidate to a threshold chosen by its coalition member
/// count (a standalone party counts as 1), falling back to `default`. A
/// member count with no bracket and no default is a fatal configuration
/// error, never a silent pass.
pub struct MemberCountBracketer {
    brackets: BTreeMap<usize, Box<dyn Eliminator>>,
    default: Option<Box<dyn Eliminator>>,
}

impl MemberCountBracketer {
    pub fn new(
        brackets: BTreeMap<usize, Box<dyn Eliminator>>,
        default: Option<Box<dyn Eliminator>>,
    ) -> Self {
        MemberCountBracketer { brackets, default }
    }
}

impl Eliminator for MemberCountBracketer {
    fn admit(
        &self,
        scores: &BTreeMap<Candidate, u64>,
        total: u128,
        ctx: &StageContext,
    ) -> Result<BTreeSet<Candidate>, EvalError> {
        let mut admitted = BTreeSet::new();
        for cand in scores.keys() {
            let members = cand.member_count();
            let bracket = self
                .brackets
                .get(&members)
                .or(self.default.as_ref())
                .ok_or(EvalError::MissingBracket {
                    member_count: members,
                })?;
            // The effective threshold is evaluated per candidate; results
            // are unioned.
            if bracket.admit(scores, total, ctx)?.contains(cand) {
                admitted.insert(cand.clone());
            }
        }
        Ok(admitted)
    }
}
