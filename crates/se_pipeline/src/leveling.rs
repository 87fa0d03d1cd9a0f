//! Overhang leveling: a bounded fixed-point search over the total seat
//! count. Constituency winners keep their seats; the chamber grows until
//! the proportional allocation, recomputed at each probed total, covers
//! every candidate's direct wins in every region.

use std::collections::BTreeMap;

use se_core::{Candidate, RegionId, Seats, Votes};

use crate::eval::ApportionScheme;
use crate::{Distributor, EvalError, StageContext};

/// Search state. `Probing` totals increase monotonically; `Converged` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Probing(u32),
    Converged(u32),
}

/// Result of a converged leveling search.
#[derive(Debug, Clone)]
pub struct LevelOutcome {
    /// The enlarged chamber size.
    pub total: u32,
    /// National per-candidate allocation at `total`.
    pub national: Seats,
    /// Per-region allocation at `total`.
    pub by_region: Seats,
    /// Direct wins beyond the proportional entitlement at the nominal size.
    pub overhang: u32,
    /// Probes spent, including the converging one.
    pub probes: u32,
}

/// Couples a national proportional evaluator with a per-region one and
/// searches for the smallest examined total at which both cover the
/// first-round constituency winners (threaded in via [`StageContext`]).
///
/// The search relies on allocations never shrinking as the total grows, so
/// the configured apportionment family must be a divisor method; largest
/// remainder is rejected at construction.
pub struct OverhangLeveler<O: Distributor, C: Distributor> {
    overall: O,
    constituency: C,
    max_probes: u32,
}

impl<O: Distributor, C: Distributor> OverhangLeveler<O, C> {
    pub fn new(
        overall: O,
        constituency: C,
        scheme: ApportionScheme,
        max_probes: u32,
    ) -> Result<Self, EvalError> {
        if !scheme.is_seat_monotonic() {
            return Err(EvalError::NonMonotonicLeveling);
        }
        if max_probes == 0 {
            return Err(EvalError::Invalid("leveling needs a positive probe cap"));
        }
        Ok(OverhangLeveler {
            overall,
            constituency,
            max_probes,
        })
    }

    /// Seats still owed: direct wins not covered by the allocation, summed
    /// over every region and over the national distribution.
    fn deficit(
        won_regions: &BTreeMap<RegionId, Seats>,
        won_merged: &BTreeMap<Candidate, u32>,
        national: &Seats,
        regional: &Seats,
    ) -> Result<u64, EvalError> {
        let mut deficit: u64 = 0;
        let national_flat = national.as_flat()?;
        for (cand, &w) in won_merged {
            let alloc = national_flat.get(cand).copied().unwrap_or(0);
            deficit += u64::from(w.saturating_sub(alloc));
        }
        let regional_map = regional.as_regions()?;
        for (region, won_sub) in won_regions {
            let alloc_sub = regional_map
                .get(region)
                .map(Seats::merged)
                .unwrap_or_default();
            for (cand, &w) in &won_sub.merged() {
                let alloc = alloc_sub.get(cand).copied().unwrap_or(0);
                deficit += u64::from(w.saturating_sub(alloc));
            }
        }
        Ok(deficit)
    }

    /// Run the search. `ctx.previous` must carry the per-region
    /// constituency wins.
    pub fn level(
        &self,
        votes: &Votes,
        nominal_seats: u32,
        ctx: &StageContext,
    ) -> Result<LevelOutcome, EvalError> {
        let won = ctx.previous.as_ref().ok_or(EvalError::MissingPreviousStage)?;
        let won_regions = won.as_regions()?;
        let won_merged = won.merged();

        // Overhang arises per region: direct wins beyond the region's
        // proportional entitlement at the nominal chamber size.
        let nominal_regional = self.constituency.evaluate(votes, nominal_seats, ctx)?;
        let nominal_map = nominal_regional.as_regions()?;
        let mut overhang: u32 = 0;
        for (region, won_sub) in won_regions {
            let alloc = nominal_map
                .get(region)
                .map(Seats::merged)
                .unwrap_or_default();
            for (cand, &w) in &won_sub.merged() {
                overhang += w.saturating_sub(alloc.get(cand).copied().unwrap_or(0));
            }
        }

        let start = nominal_seats.max(won.total().min(u128::from(u32::MAX)) as u32);
        let mut state = ProbeState::Probing(start);
        let mut probes: u32 = 0;
        loop {
            let total = match state {
                ProbeState::Probing(t) => t,
                ProbeState::Converged(t) => {
                    let national = self.overall.evaluate(votes, t, ctx)?;
                    let by_region = self.constituency.evaluate(votes, t, ctx)?;
                    return Ok(LevelOutcome {
                        total: t,
                        national,
                        by_region,
                        overhang,
                        probes,
                    });
                }
            };
            if probes == self.max_probes {
                return Err(EvalError::NonConvergence { probes });
            }
            probes += 1;

            let national = self.overall.evaluate(votes, total, ctx)?;
            let regional = self.constituency.evaluate(votes, total, ctx)?;
            let deficit = Self::deficit(won_regions, &won_merged, &national, &regional)?;
            log::debug!("leveling probe {probes}: total {total}, deficit {deficit}");

            state = if deficit == 0 {
                ProbeState::Converged(total)
            } else {
                let grow = deficit.max(1).min(u64::from(u32::MAX)) as u32;
                ProbeState::Probing(total.saturating_add(grow))
            };
        }
    }
}

impl<O: Distributor, C: Distributor> Distributor for OverhangLeveler<O, C> {
    fn evaluate(&self, votes: &Votes, seats: u32, ctx: &StageContext) -> Result<Seats, EvalError> {
        Ok(self.level(votes, seats, ctx)?.by_region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{ByConstituency, PreConverted, RegionSeats};
    use crate::convert::vote_totals;
    use crate::eval::HighestAverages;
    use se_algo::{DivisorMethod, QuotaMethod};

    fn cand(n: &str) -> Candidate {
        Candidate::party(n).unwrap()
    }

    fn region(n: &str) -> RegionId {
        n.parse().unwrap()
    }

    fn flat_votes(pairs: &[(&str, u64)]) -> Votes {
        Votes::Flat(pairs.iter().map(|&(n, v)| (cand(n), v)).collect())
    }

    fn flat_seats(pairs: &[(&str, u32)]) -> Seats {
        Seats::Flat(pairs.iter().map(|&(n, v)| (cand(n), v)).collect())
    }

    fn leveler() -> OverhangLeveler<
        PreConverted<HighestAverages>,
        ByConstituency<HighestAverages>,
    > {
        let overall = PreConverted::new(
            vote_totals,
            HighestAverages::new(DivisorMethod::SainteLague),
        );
        let weights = [(region("n"), 500u64), (region("s"), 500u64)]
            .into_iter()
            .collect();
        let constituency = ByConstituency::new(
            HighestAverages::new(DivisorMethod::SainteLague),
            RegionSeats::ApportionTotal {
                weights,
                method: DivisorMethod::SainteLague,
            },
        );
        OverhangLeveler::new(
            overall,
            constituency,
            ApportionScheme::Divisor(DivisorMethod::SainteLague),
            1000,
        )
        .unwrap()
    }

    fn split_votes() -> Votes {
        Votes::ByRegion(
            [
                (region("n"), flat_votes(&[("A", 300), ("B", 700)])),
                (region("s"), flat_votes(&[("A", 300), ("B", 700)])),
            ]
            .into_iter()
            .collect(),
        )
    }

    #[test]
    fn rejects_largest_remainder() {
        let overall = HighestAverages::new(DivisorMethod::SainteLague);
        let constituency = HighestAverages::new(DivisorMethod::SainteLague);
        let err = OverhangLeveler::new(
            overall,
            constituency,
            ApportionScheme::LargestRemainder(QuotaMethod::Hare),
            100,
        );
        assert!(matches!(err, Err(EvalError::NonMonotonicLeveling)));
    }

    #[test]
    fn missing_constituency_wins_is_an_error() {
        let err = leveler().level(&split_votes(), 10, &StageContext::default());
        assert!(matches!(err, Err(EvalError::MissingPreviousStage)));
    }

    #[test]
    fn no_overhang_converges_at_nominal_total() {
        // Direct wins already within everyone's proportional share.
        let won = Seats::ByRegion(
            [
                (region("n"), flat_seats(&[("B", 3)])),
                (region("s"), flat_seats(&[("B", 3)])),
            ]
            .into_iter()
            .collect(),
        );
        let outcome = leveler()
            .level(&split_votes(), 10, &StageContext::with_previous(won))
            .unwrap();
        assert_eq!(outcome.total, 10);
        assert_eq!(outcome.overhang, 0);
        assert_eq!(outcome.probes, 1);
    }

    #[test]
    fn overhang_enlarges_the_chamber() {
        // A wins 3 direct seats in the north but its vote share at 10
        // total seats entitles it to 3 nationally and only 1-2 per region.
        let won = Seats::ByRegion(
            [
                (region("n"), flat_seats(&[("A", 3)])),
                (region("s"), flat_seats(&[("B", 2)])),
            ]
            .into_iter()
            .collect(),
        );
        let ctx = StageContext::with_previous(won.clone());
        let outcome = leveler().level(&split_votes(), 10, &ctx).unwrap();

        assert!(outcome.total > 10, "total {} not enlarged", outcome.total);
        assert!(outcome.overhang > 0);
        // Every region's final allocation covers its direct wins.
        let by_region = outcome.by_region.as_regions().unwrap();
        for (r, won_sub) in won.as_regions().unwrap() {
            let alloc = by_region[r].merged();
            for (cand, &w) in &won_sub.merged() {
                assert!(alloc.get(cand).copied().unwrap_or(0) >= w, "{cand} short in {r}");
            }
        }
        assert_eq!(outcome.by_region.total(), u128::from(outcome.total));
    }

    #[test]
    fn converged_total_stays_satisfied_when_grown() {
        // Monotonicity regression: any total past convergence still covers
        // the direct wins.
        let won = Seats::ByRegion(
            [
                (region("n"), flat_seats(&[("A", 3)])),
                (region("s"), flat_seats(&[("B", 2)])),
            ]
            .into_iter()
            .collect(),
        );
        let ctx = StageContext::with_previous(won.clone());
        let lev = leveler();
        let outcome = lev.level(&split_votes(), 10, &ctx).unwrap();

        for extra in 1..=5u32 {
            let grown = lev.level(&split_votes(), outcome.total + extra, &ctx).unwrap();
            assert_eq!(grown.probes, 1, "total {} needed releveling", outcome.total + extra);
        }
    }

    #[test]
    fn probe_cap_is_a_hard_ceiling() {
        let overall = PreConverted::new(
            vote_totals,
            HighestAverages::new(DivisorMethod::SainteLague),
        );
        // Fixed region magnitudes never grow with the probed total, so a
        // direct-win floor above them can never be met.
        let constituency = ByConstituency::new(
            HighestAverages::new(DivisorMethod::SainteLague),
            RegionSeats::Uniform(1),
        );
        let lev = OverhangLeveler::new(
            overall,
            constituency,
            ApportionScheme::Divisor(DivisorMethod::SainteLague),
            8,
        )
        .unwrap();
        let won = Seats::ByRegion(
            [(region("n"), flat_seats(&[("A", 5)]))].into_iter().collect(),
        );
        let votes = Votes::ByRegion(
            [(region("n"), flat_votes(&[("A", 100), ("B", 900)]))]
                .into_iter()
                .collect(),
        );
        let err = lev.level(&votes, 5, &StageContext::with_previous(won));
        assert!(matches!(err, Err(EvalError::NonConvergence { probes: 8 })));
    }
}
