//! Threshold predicate math: which candidates clear a qualification bar.
//!
//! These are the pure building blocks; the evaluator-facing wrappers
//! (alternatives, member-count brackets, prior-stage substitution) live in
//! `se_pipeline`. Exclusion is destructive: a candidate dropped here gets
//! zero seats at the stage that consumed the filter.
//!
//! Monotonicity: raising a fraction/count parameter never admits a
//! previously-excluded candidate (integer comparisons only).

extern crate alloc;

use alloc::collections::{BTreeMap, BTreeSet};

use se_core::rounding::{ge_fraction, gt_fraction, Fraction};

/// Candidates whose share of `total` meets `frac` (≥ when `accept_equal`,
/// else strictly >). A zero total admits nobody.
pub fn admitted_by_fraction<K: Ord + Clone>(
    scores: &BTreeMap<K, u64>,
    total: u128,
    frac: Fraction,
    accept_equal: bool,
) -> BTreeSet<K> {
    scores
        .iter()
        .filter(|(_, &v)| {
            if accept_equal {
                ge_fraction(v as u128, total, frac)
            } else {
                gt_fraction(v as u128, total, frac)
            }
        })
        .map(|(k, _)| k.clone())
        .collect()
}

/// Candidates whose value meets an absolute floor (≥ `count`).
pub fn admitted_by_count<K: Ord + Clone>(scores: &BTreeMap<K, u64>, count: u64) -> BTreeSet<K> {
    scores
        .iter()
        .filter(|(_, &v)| v >= count)
        .map(|(k, _)| k.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn frac(num: u64, den: u64) -> Fraction {
        Fraction::new(num, den).unwrap()
    }

    #[test]
    fn exact_share_respects_accept_equal() {
        let scores: BTreeMap<&str, u64> = [("A", 70_000), ("B", 930_000)].into_iter().collect();
        let total = 1_000_000u128;
        let seven_pct = frac(7, 100);
        assert!(admitted_by_fraction(&scores, total, seven_pct, true).contains("A"));
        assert!(!admitted_by_fraction(&scores, total, seven_pct, false).contains("A"));
    }

    #[test]
    fn one_vote_below_is_out_either_way() {
        let scores: BTreeMap<&str, u64> = [("A", 69_999), ("B", 930_001)].into_iter().collect();
        let seven_pct = frac(7, 100);
        let admitted = admitted_by_fraction(&scores, 1_000_000, seven_pct, true);
        assert!(!admitted.contains("A"));
        assert!(admitted.contains("B"));
    }

    #[test]
    fn zero_total_admits_nobody() {
        let scores: BTreeMap<&str, u64> = [("A", 0)].into_iter().collect();
        assert!(admitted_by_fraction(&scores, 0, frac(0, 1), true).is_empty());
    }

    #[test]
    fn absolute_floor() {
        let scores: BTreeMap<&str, u64> = [("A", 3), ("B", 2)].into_iter().collect();
        let admitted = admitted_by_count(&scores, 3);
        assert!(admitted.contains("A"));
        assert!(!admitted.contains("B"));
    }

    proptest! {
        /// Raising the threshold never admits a previously-excluded candidate.
        #[test]
        fn fraction_monotonic(
            scores in proptest::collection::btree_map(0u8..20, 0u64..100_000, 1..10),
            lo_num in 0u64..50,
            hi_extra in 1u64..50,
        ) {
            let total: u128 = scores.values().map(|&v| v as u128).sum();
            let lo = frac(lo_num, 100);
            let hi = frac(lo_num + hi_extra, 100);
            let at_lo = admitted_by_fraction(&scores, total, lo, true);
            let at_hi = admitted_by_fraction(&scores, total, hi, true);
            prop_assert!(at_hi.is_subset(&at_lo));
        }

        #[test]
        fn count_monotonic(
            scores in proptest::collection::btree_map(0u8..20, 0u64..100_000, 1..10),
            lo in 0u64..1_000,
            extra in 1u64..1_000,
        ) {
            let at_lo = admitted_by_count(&scores, lo);
            let at_hi = admitted_by_count(&scores, lo + extra);
            prop_assert!(at_hi.is_subset(&at_lo));
        }
    }
}
