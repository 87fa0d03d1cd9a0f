//! Combinators: evaluators wrapping other evaluators. Each one reshapes
//! data (filter, convert, fan out per region, split per party) around its
//! children and leaves the actual seat math to them.

use std::collections::{BTreeMap, BTreeSet};

use se_algo::DivisorMethod;
use se_core::{Candidate, RegionId, Seats, Votes};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::eval::ApportionScheme;
use crate::{Distributor, Eliminator, EvalError, StageContext};

/// Applies a threshold before the wrapped evaluator runs: candidates the
/// eliminator rejects are removed from the votes at every nesting level and
/// reappear in the result with zero seats.
pub struct Conditioned<E: Eliminator, D: Distributor> {
    eliminator: E,
    inner: D,
}

impl<E: Eliminator, D: Distributor> Conditioned<E, D> {
    pub fn new(eliminator: E, inner: D) -> Self {
        Conditioned { eliminator, inner }
    }
}

/// Re-insert excluded candidates with zero seats wherever their votes
/// appeared, so result shape still names every contestant.
fn zero_fill(seats: Seats, votes: &Votes, excluded: &BTreeSet<Candidate>) -> Seats {
    match (seats, votes) {
        // A flat result gets every excluded contestant back, even when the
        // inner evaluator collapsed nested votes to a single mapping.
        (Seats::Flat(mut m), v) => {
            for cand in v.flattened().keys() {
                if excluded.contains(cand) {
                    m.entry(cand.clone()).or_insert(0);
                }
            }
            Seats::Flat(m)
        }
        (Seats::ByRegion(m), Votes::ByRegion(v)) => Seats::ByRegion(
            m.into_iter()
                .map(|(region, sub)| {
                    let filled = match v.get(&region) {
                        Some(sub_votes) => zero_fill(sub, sub_votes, excluded),
                        None => sub,
                    };
                    (region, filled)
                })
                .collect(),
        ),
        (other, _) => other,
    }
}

impl<E: Eliminator, D: Distributor> Distributor for Conditioned<E, D> {
    fn evaluate(&self, votes: &Votes, seats: u32, ctx: &StageContext) -> Result<Seats, EvalError> {
        let totals = votes.flattened();
        let admitted = self.eliminator.admit(&totals, votes.total(), ctx)?;
        let excluded: BTreeSet<Candidate> = totals
            .keys()
            .filter(|c| !admitted.contains(*c))
            .cloned()
            .collect();
        let surviving = votes.restricted(&admitted);
        let result = self.inner.evaluate(&surviving, seats, ctx)?;
        Ok(zero_fill(result, votes, &excluded))
    }
}

type VoteConvert = dyn Fn(&Votes) -> Result<Votes, EvalError> + Send + Sync;
type SeatConvert = dyn Fn(Seats) -> Result<Seats, EvalError> + Send + Sync;

/// Converts the votes before the wrapped evaluator sees them (e.g. collapse
/// a regional tree to nationwide totals via [`crate::vote_totals`]).
pub struct PreConverted<D: Distributor> {
    convert: Box<VoteConvert>,
    inner: D,
}

impl<D: Distributor> PreConverted<D> {
    pub fn new<F>(convert: F, inner: D) -> Self
    where
        F: Fn(&Votes) -> Result<Votes, EvalError> + Send + Sync + 'static,
    {
        PreConverted {
            convert: Box::new(convert),
            inner,
        }
    }
}

impl<D: Distributor> Distributor for PreConverted<D> {
    fn evaluate(&self, votes: &Votes, seats: u32, ctx: &StageContext) -> Result<Seats, EvalError> {
        let converted = (self.convert)(votes)?;
        self.inner.evaluate(&converted, seats, ctx)
    }
}

/// Converts the wrapped evaluator's result before returning it.
pub struct PostConverted<D: Distributor> {
    inner: D,
    convert: Box<SeatConvert>,
}

impl<D: Distributor> PostConverted<D> {
    pub fn new<F>(inner: D, convert: F) -> Self
    where
        F: Fn(Seats) -> Result<Seats, EvalError> + Send + Sync + 'static,
    {
        PostConverted {
            inner,
            convert: Box::new(convert),
        }
    }
}

impl<D: Distributor> Distributor for PostConverted<D> {
    fn evaluate(&self, votes: &Votes, seats: u32, ctx: &StageContext) -> Result<Seats, EvalError> {
        let result = self.inner.evaluate(votes, seats, ctx)?;
        (self.convert)(result)
    }
}

/// Pins the seat total, ignoring whatever the caller requested. Useful at
/// the top of a tree where house size is fixed by law.
pub struct FixedSeatCount<D: Distributor> {
    inner: D,
    total: u32,
}

impl<D: Distributor> FixedSeatCount<D> {
    pub fn new(inner: D, total: u32) -> Self {
        FixedSeatCount { inner, total }
    }
}

impl<D: Distributor> Distributor for FixedSeatCount<D> {
    fn evaluate(&self, votes: &Votes, _seats: u32, ctx: &StageContext) -> Result<Seats, EvalError> {
        self.inner.evaluate(votes, self.total, ctx)
    }
}

/// How many seats each constituency gets.
pub enum RegionSeats {
    /// Every region gets the same count.
    Uniform(u32),
    /// Explicit per-region magnitudes; a region absent here is an error.
    PerRegion(BTreeMap<RegionId, u32>),
    /// Apportion the requested total across regions by weight (population
    /// or registered voters) with a divisor method.
    ApportionTotal {
        weights: BTreeMap<RegionId, u64>,
        method: DivisorMethod,
    },
}

impl RegionSeats {
    fn resolve(
        &self,
        regions: &BTreeMap<RegionId, Votes>,
        requested: u32,
    ) -> Result<BTreeMap<RegionId, u32>, EvalError> {
        match self {
            RegionSeats::Uniform(n) => {
                Ok(regions.keys().map(|r| (r.clone(), *n)).collect())
            }
            RegionSeats::PerRegion(magnitudes) => {
                let mut out = BTreeMap::new();
                for region in regions.keys() {
                    let n = magnitudes
                        .get(region)
                        .copied()
                        .ok_or(EvalError::Invalid("region has no seat magnitude"))
                        .map_err(|e| e.in_region(region))?;
                    out.insert(region.clone(), n);
                }
                Ok(out)
            }
            RegionSeats::ApportionTotal { weights, method } => {
                for region in regions.keys() {
                    if !weights.contains_key(region) {
                        return Err(
                            EvalError::Invalid("region has no apportionment weight")
                                .in_region(region),
                        );
                    }
                }
                // A weight for a region absent from the votes would win
                // seats that never reach the output.
                for region in weights.keys() {
                    if !regions.contains_key(region) {
                        return Err(
                            EvalError::Invalid("apportionment weight names an unknown region")
                                .in_region(region),
                        );
                    }
                }
                let alloc =
                    ApportionScheme::Divisor(*method).apportion(requested, weights, None)?;
                Ok(alloc)
            }
        }
    }
}

/// Fans a flat evaluator out over every region of a nested vote mapping.
/// Regions are independent contests: each sees only its own votes and its
/// own slice of any carried-over results, and a failure is reported with
/// the region it happened in.
pub struct ByConstituency<D: Distributor> {
    inner: D,
    seats_rule: RegionSeats,
    preselector: Option<Box<dyn Eliminator>>,
}

impl<D: Distributor> ByConstituency<D> {
    pub fn new(inner: D, seats_rule: RegionSeats) -> Self {
        ByConstituency {
            inner,
            seats_rule,
            preselector: None,
        }
    }

    /// Apply a nationwide threshold (judged on summed totals) before any
    /// regional contest runs.
    pub fn with_preselector(mut self, preselector: Box<dyn Eliminator>) -> Self {
        self.preselector = Some(preselector);
        self
    }

    fn admitted(
        &self,
        votes: &Votes,
        ctx: &StageContext,
    ) -> Result<Option<BTreeSet<Candidate>>, EvalError> {
        match &self.preselector {
            Some(pre) => {
                let totals = votes.flattened();
                Ok(Some(pre.admit(&totals, votes.total(), ctx)?))
            }
            None => Ok(None),
        }
    }
}

impl<D: Distributor> Distributor for ByConstituency<D> {
    fn evaluate(&self, votes: &Votes, seats: u32, ctx: &StageContext) -> Result<Seats, EvalError> {
        let regions = votes.as_regions()?;
        let admitted = self.admitted(votes, ctx)?;
        let magnitudes = self.seats_rule.resolve(regions, seats)?;

        let eval_one = |(region, sub): (&RegionId, &Votes)| -> Result<(RegionId, Seats), EvalError> {
            let restricted;
            let sub = match &admitted {
                Some(keep) => {
                    restricted = sub.restricted(keep);
                    &restricted
                }
                None => sub,
            };
            let n = magnitudes.get(region).copied().unwrap_or(0);
            log::trace!("evaluating region {region} with {n} seats");
            let result = self
                .inner
                .evaluate(sub, n, &ctx.narrowed(region))
                .map_err(|e| e.in_region(region))?;
            Ok((region.clone(), result))
        };

        #[cfg(feature = "parallel")]
        let results: Result<BTreeMap<RegionId, Seats>, EvalError> =
            regions.par_iter().map(eval_one).collect();
        #[cfg(not(feature = "parallel"))]
        let results: Result<BTreeMap<RegionId, Seats>, EvalError> =
            regions.iter().map(eval_one).collect();

        Ok(Seats::ByRegion(results?))
    }
}

/// Nationwide proportionality with regional seat placement: the overall
/// evaluator fixes each party's national seat count from summed votes, then
/// each party's seats are split across regions in proportion to where its
/// votes came from.
pub struct ByParty<D: Distributor> {
    overall: D,
    allocator: ApportionScheme,
}

impl<D: Distributor> ByParty<D> {
    pub fn new(overall: D, allocator: ApportionScheme) -> Self {
        ByParty { overall, allocator }
    }
}

impl<D: Distributor> Distributor for ByParty<D> {
    fn evaluate(&self, votes: &Votes, seats: u32, ctx: &StageContext) -> Result<Seats, EvalError> {
        let regions = votes.as_regions()?;
        let national = self
            .overall
            .evaluate(&Votes::Flat(votes.flattened()), seats, ctx)?;
        let national = national.as_flat()?;

        let mut out: BTreeMap<RegionId, BTreeMap<Candidate, u32>> = regions
            .keys()
            .map(|r| (r.clone(), BTreeMap::new()))
            .collect();

        for (party, &won) in national {
            if won == 0 {
                continue;
            }
            let mut regional_votes: BTreeMap<RegionId, u64> = BTreeMap::new();
            for (region, sub) in regions {
                let v = sub.flattened().get(party).copied().unwrap_or(0);
                regional_votes.insert(region.clone(), v);
            }
            let split = self.allocator.apportion(won, &regional_votes, None)?;
            for (region, n) in split {
                if let Some(slot) = out.get_mut(&region) {
                    slot.insert(party.clone(), n);
                }
            }
        }

        Ok(Seats::ByRegion(
            out.into_iter().map(|(r, m)| (r, Seats::Flat(m))).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{HighestAverages, LargestRemainder};
    use crate::thresholds::RelativeThreshold;
    use se_algo::QuotaMethod;
    use se_core::rounding::Fraction;

    fn cand(n: &str) -> Candidate {
        Candidate::party(n).unwrap()
    }

    fn region(n: &str) -> RegionId {
        n.parse().unwrap()
    }

    fn flat(pairs: &[(&str, u64)]) -> Votes {
        Votes::Flat(pairs.iter().map(|&(n, v)| (cand(n), v)).collect())
    }

    #[test]
    fn conditioned_excludes_and_zero_fills() {
        let votes = flat(&[("A", 920), ("B", 40), ("C", 40)]);
        let eval = Conditioned::new(
            RelativeThreshold::new(Fraction::new(5, 100).unwrap(), true),
            HighestAverages::new(DivisorMethod::DHondt),
        );
        let seats = eval.evaluate(&votes, 10, &StageContext::default()).unwrap();
        let m = seats.as_flat().unwrap();
        assert_eq!(m[&cand("A")], 10);
        assert_eq!(m[&cand("B")], 0);
        assert_eq!(m[&cand("C")], 0);
        assert_eq!(seats.total(), 10);
    }

    #[test]
    fn conditioned_zero_fills_after_shape_collapse() {
        // The inner evaluator flattens the regional votes to nationwide
        // totals; the excluded candidate must still come back with zero
        // seats in the flat result.
        let votes = Votes::ByRegion(
            [
                (region("east"), flat(&[("A", 480), ("B", 10)])),
                (region("west"), flat(&[("A", 500), ("B", 10)])),
            ]
            .into_iter()
            .collect(),
        );
        let eval = Conditioned::new(
            RelativeThreshold::new(Fraction::new(5, 100).unwrap(), true),
            PreConverted::new(
                crate::vote_totals,
                HighestAverages::new(DivisorMethod::DHondt),
            ),
        );
        let seats = eval.evaluate(&votes, 10, &StageContext::default()).unwrap();
        let m = seats.as_flat().unwrap();
        assert_eq!(m[&cand("A")], 10);
        assert_eq!(m[&cand("B")], 0);
    }

    #[test]
    fn conditioned_threshold_judged_on_unrestricted_total() {
        // B holds exactly 5% of the full total; restriction must not
        // change the denominator it is judged against.
        let votes = flat(&[("A", 950), ("B", 50)]);
        let eval = Conditioned::new(
            RelativeThreshold::new(Fraction::new(5, 100).unwrap(), true),
            HighestAverages::new(DivisorMethod::DHondt),
        );
        let seats = eval.evaluate(&votes, 4, &StageContext::default()).unwrap();
        assert!(seats.as_flat().unwrap().contains_key(&cand("B")));
    }

    #[test]
    fn fixed_seat_count_overrides_request() {
        let votes = flat(&[("A", 3), ("B", 1)]);
        let eval = FixedSeatCount::new(HighestAverages::new(DivisorMethod::DHondt), 4);
        let seats = eval.evaluate(&votes, 999, &StageContext::default()).unwrap();
        assert_eq!(seats.total(), 4);
    }

    #[test]
    fn by_constituency_uniform_runs_each_region_independently() {
        let votes = Votes::ByRegion(
            [
                (region("east"), flat(&[("A", 600), ("B", 400)])),
                (region("west"), flat(&[("A", 100), ("B", 900)])),
            ]
            .into_iter()
            .collect(),
        );
        let eval = ByConstituency::new(
            HighestAverages::new(DivisorMethod::DHondt),
            RegionSeats::Uniform(5),
        );
        let seats = eval.evaluate(&votes, 0, &StageContext::default()).unwrap();
        let regions = seats.as_regions().unwrap();
        assert_eq!(regions[&region("east")].total(), 5);
        assert_eq!(regions[&region("west")].total(), 5);
        assert_eq!(regions[&region("west")].as_flat().unwrap()[&cand("B")], 5);
    }

    #[test]
    fn by_constituency_missing_magnitude_names_region() {
        let votes = Votes::ByRegion(
            [(region("east"), flat(&[("A", 1)]))].into_iter().collect(),
        );
        let eval = ByConstituency::new(
            HighestAverages::new(DivisorMethod::DHondt),
            RegionSeats::PerRegion(BTreeMap::new()),
        );
        let err = eval.evaluate(&votes, 0, &StageContext::default());
        match err {
            Err(EvalError::InRegion { region: r, .. }) => assert_eq!(r, region("east")),
            other => panic!("expected InRegion, got {other:?}"),
        }
    }

    #[test]
    fn by_constituency_apportions_magnitudes_by_weight() {
        let votes = Votes::ByRegion(
            [
                (region("a"), flat(&[("P", 1)])),
                (region("b"), flat(&[("P", 1)])),
            ]
            .into_iter()
            .collect(),
        );
        let weights: BTreeMap<RegionId, u64> =
            [(region("a"), 2_673_803), (region("b"), 15_707_569)]
                .into_iter()
                .collect();
        let eval = ByConstituency::new(
            HighestAverages::new(DivisorMethod::SainteLague),
            RegionSeats::ApportionTotal {
                weights,
                method: DivisorMethod::SainteLague,
            },
        );
        let seats = eval.evaluate(&votes, 598, &StageContext::default()).unwrap();
        let regions = seats.as_regions().unwrap();
        assert_eq!(regions[&region("a")].total(), 87);
        assert_eq!(regions[&region("b")].total(), 511);
    }

    #[test]
    fn apportion_total_rejects_weight_for_unknown_region() {
        // Seats apportioned to a region nobody voted in would vanish from
        // the output; the mismatch is an error up front.
        let votes = Votes::ByRegion(
            [
                (region("a"), flat(&[("P", 1)])),
                (region("b"), flat(&[("P", 1)])),
            ]
            .into_iter()
            .collect(),
        );
        let weights: BTreeMap<RegionId, u64> =
            [(region("a"), 4), (region("b"), 2), (region("ghost"), 3)]
                .into_iter()
                .collect();
        let eval = ByConstituency::new(
            HighestAverages::new(DivisorMethod::DHondt),
            RegionSeats::ApportionTotal {
                weights,
                method: DivisorMethod::DHondt,
            },
        );
        let err = eval.evaluate(&votes, 9, &StageContext::default());
        match err {
            Err(EvalError::InRegion { region: r, .. }) => assert_eq!(r, region("ghost")),
            other => panic!("expected InRegion, got {other:?}"),
        }
    }

    #[test]
    fn by_constituency_preselector_uses_national_totals() {
        // B clears 5% nationally only because of the west; it must stay
        // eligible in the east too.
        let votes = Votes::ByRegion(
            [
                (region("east"), flat(&[("A", 980), ("B", 20)])),
                (region("west"), flat(&[("A", 400), ("B", 600)])),
            ]
            .into_iter()
            .collect(),
        );
        let eval = ByConstituency::new(
            LargestRemainder::new(QuotaMethod::Hare),
            RegionSeats::Uniform(10),
        )
        .with_preselector(Box::new(RelativeThreshold::new(
            Fraction::new(5, 100).unwrap(),
            true,
        )));
        let seats = eval.evaluate(&votes, 0, &StageContext::default()).unwrap();
        let west = seats.as_regions().unwrap()[&region("west")].as_flat().unwrap();
        assert_eq!(west[&cand("B")], 6);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_fan_out_matches_per_region_evaluation() {
        let regions: BTreeMap<RegionId, Votes> = (0u64..16)
            .map(|i| {
                (
                    region(&format!("r{i:02}")),
                    flat(&[("A", 100 + 7 * i), ("B", 260 - 9 * i), ("C", 40 + i)]),
                )
            })
            .collect();
        let votes = Votes::ByRegion(regions.clone());
        let eval = ByConstituency::new(
            HighestAverages::new(DivisorMethod::SainteLague),
            RegionSeats::Uniform(7),
        );
        let combined = eval.evaluate(&votes, 0, &StageContext::default()).unwrap();
        let combined = combined.as_regions().unwrap();
        let solo = HighestAverages::new(DivisorMethod::SainteLague);
        for (r, sub) in &regions {
            let expected = solo.evaluate(sub, 7, &StageContext::default()).unwrap();
            assert_eq!(combined[r], expected, "region {r}");
        }
    }

    #[test]
    fn by_party_splits_national_seats_where_votes_came_from() {
        let votes = Votes::ByRegion(
            [
                (region("north"), flat(&[("A", 8_000), ("B", 2_000)])),
                (region("south"), flat(&[("A", 2_000), ("B", 8_000)])),
            ]
            .into_iter()
            .collect(),
        );
        let eval = ByParty::new(
            HighestAverages::new(DivisorMethod::SainteLague),
            ApportionScheme::Divisor(DivisorMethod::SainteLague),
        );
        let seats = eval.evaluate(&votes, 10, &StageContext::default()).unwrap();
        assert_eq!(seats.total(), 10);
        let merged = seats.merged();
        assert_eq!(merged[&cand("A")], 5);
        assert_eq!(merged[&cand("B")], 5);
        let north = seats.as_regions().unwrap()[&region("north")].as_flat().unwrap();
        assert_eq!(north[&cand("A")], 4);
        assert_eq!(north[&cand("B")], 1);
    }
}
