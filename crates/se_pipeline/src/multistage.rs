//! Sequential multi-stage evaluation (mixed-member systems). Each stage
//! gets its own vote set; the finished result of one stage is handed to
//! the next through [`StageContext`], never mutated in place.

use se_core::{Seats, Votes};

use crate::{Distributor, EvalError, StageContext};

/// Runs stages in order, threading each stage's result into the next
/// stage's context. The final stage's result is the overall result; stages
/// whose outputs must *combine* (rather than supersede) do so inside the
/// last stage's evaluator, which sees the carry-over.
pub struct MultistageDistributor {
    stages: Vec<Box<dyn Distributor>>,
    depth: usize,
}

impl MultistageDistributor {
    /// `depth` is the nesting depth every stage's votes must have
    /// (0 = flat, 1 = by region), matching [`Votes::depth`].
    pub fn new(stages: Vec<Box<dyn Distributor>>, depth: usize) -> Result<Self, EvalError> {
        if stages.is_empty() {
            return Err(EvalError::Invalid("multistage needs at least one stage"));
        }
        Ok(MultistageDistributor { stages, depth })
    }

    /// One vote set per stage, in stage order.
    pub fn evaluate(&self, votes: &[Votes], seats: u32) -> Result<Seats, EvalError> {
        self.evaluate_with(votes, seats, &StageContext::default())
    }

    /// As [`Self::evaluate`], with an initial carry-over for the first
    /// stage (used when this pipeline is itself a later stage).
    pub fn evaluate_with(
        &self,
        votes: &[Votes],
        seats: u32,
        ctx: &StageContext,
    ) -> Result<Seats, EvalError> {
        if votes.len() != self.stages.len() {
            return Err(EvalError::Invalid("one vote set per stage required"));
        }
        let mut ctx = ctx.clone();
        let mut result: Option<Seats> = None;
        for (i, (stage, stage_votes)) in self.stages.iter().zip(votes).enumerate() {
            let actual = stage_votes.depth().map_err(|e| EvalError::from(e).in_stage(i))?;
            if actual != self.depth {
                return Err(EvalError::DepthMismatch {
                    expected: self.depth,
                    actual,
                }
                .in_stage(i));
            }
            let stage_result = stage
                .evaluate(stage_votes, seats, &ctx)
                .map_err(|e| e.in_stage(i))?;
            log::debug!(
                "stage {} allocated {} seats across {} entries",
                i,
                stage_result.total(),
                stage_result.merged().len()
            );
            ctx = StageContext::with_previous(stage_result.clone());
            result = Some(stage_result);
        }
        // Constructor guarantees at least one stage.
        result.ok_or(EvalError::Invalid("multistage needs at least one stage"))
    }
}
