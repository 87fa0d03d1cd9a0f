//! Largest-remainder (LR) apportionment per unit with selectable quota
//! (Hare, Hagenbach-Bischoff, rounded Hagenbach-Bischoff).
//!
//! Contract:
//! - Quotas are exact rationals over the vote total `V` and seat target `T`:
//!     * Hare:                    V / T
//!     * Hagenbach-Bischoff:      V / (T + 1)
//!     * HB, mathematically rounded: round_half_even(V / (T + 1)) as an
//!       integer quota (the Slovak national-council form).
//! - Floors are v·den / num (integer div); remainder keys are v·den % num.
//!   Every candidate shares the quota denominator, so remainders compare
//!   exactly without fractions.
//! - If sum(floors) < T → distribute leftovers by largest remainder
//!   (tie keys: remainder ↓, raw score ↓, then canonical order).
//! - If sum(floors) > T (rounded-quota edge) → trim from smallest remainder
//!   (remainder ↑, raw score ↑, then canonical order).
//! - LR admits non-monotonic paradoxes (adding seats can cost a party one);
//!   that is the rule, preserved as-is.
//!
//! Determinism:
//! - No RNG here; deterministic tie-breaking only.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use se_core::determinism::{build_order_index, order_rank};
use se_core::rounding::round_nearest_even_int;

use crate::AllocError;

/// Quota function, selected by name.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum QuotaMethod {
    Hare,
    HagenbachBischoff,
    /// Hagenbach-Bischoff with the quota rounded half-to-even before division.
    HagenbachBischoffRounded,
}

impl QuotaMethod {
    /// Quota as an exact rational `(num, den)` for vote total `total` and
    /// seat target `seats` (`seats > 0` guaranteed by the caller).
    fn quota(self, total: u128, seats: u128) -> (u128, u128) {
        match self {
            QuotaMethod::Hare => (total, seats),
            QuotaMethod::HagenbachBischoff => (total, seats + 1),
            QuotaMethod::HagenbachBischoffRounded => {
                // seats + 1 > 0, so the rounding cannot fail.
                let q = round_nearest_even_int(total, seats + 1).unwrap_or(0);
                (q, 1)
            }
        }
    }
}

/// Apportion `seats` among `scores` keys by quota floors plus
/// remainder-ranked top-up. The awarded total always equals `seats`.
///
/// `order`, when given, fixes the canonical tie order; keys it omits sort
/// after it in ascending key order.
pub fn largest_remainder<K: Ord + Clone>(
    seats: u32,
    scores: &BTreeMap<K, u64>,
    order: Option<&[K]>,
    quota: QuotaMethod,
) -> Result<BTreeMap<K, u32>, AllocError> {
    let mut alloc: BTreeMap<K, u32> = scores.keys().cloned().map(|k| (k, 0)).collect();
    if seats == 0 {
        return Ok(alloc);
    }
    if scores.is_empty() {
        return Err(AllocError::NoCandidates);
    }

    let total: u128 = scores.values().map(|&v| v as u128).sum();
    if total == 0 {
        return Err(AllocError::AllVotesZero);
    }

    let (q_num, q_den) = quota.quota(total, seats as u128);

    // Floors and exact remainder keys. A degenerate quota (numerator 0 after
    // rounding tiny totals) leaves floors at zero and remainders at raw votes.
    let mut remainders: BTreeMap<K, u128> = BTreeMap::new();
    for (k, &v) in scores {
        let scaled = (v as u128) * q_den;
        if q_num == 0 {
            remainders.insert(k.clone(), scaled);
        } else {
            let f = scaled / q_num;
            let f = if f > u32::MAX as u128 { u32::MAX } else { f as u32 };
            alloc.insert(k.clone(), f);
            remainders.insert(k.clone(), scaled % q_num);
        }
    }

    let sum_floors: u128 = alloc.values().map(|&s| s as u128).sum();
    let order_ix = order.map(build_order_index::<K>);
    if sum_floors < seats as u128 {
        let needed = (seats as u128 - sum_floors) as u32;
        distribute_leftovers(needed, &mut alloc, &remainders, scores, order_ix.as_ref());
    } else if sum_floors > seats as u128 {
        trim_over_allocation(seats, &mut alloc, &remainders, scores, order_ix.as_ref());
    }

    let awarded: u128 = alloc.values().map(|&s| s as u128).sum();
    if awarded != seats as u128 {
        return Err(AllocError::TotalMismatch {
            awarded,
            requested: seats as u128,
        });
    }
    Ok(alloc)
}

/// Ranking rows: (key, remainder, raw score, canonical rank).
fn ranking_rows<K: Ord + Clone>(
    keys: impl Iterator<Item = K>,
    remainders: &BTreeMap<K, u128>,
    scores: &BTreeMap<K, u64>,
    order_ix: Option<&BTreeMap<K, usize>>,
) -> Vec<(K, u128, u64, usize)> {
    keys.map(|k| {
        let r = *remainders.get(&k).unwrap_or(&0);
        let sc = *scores.get(&k).unwrap_or(&0);
        let ix = order_ix.map_or(usize::MAX, |m| order_rank(m, &k));
        (k, r, sc, ix)
    })
    .collect()
}

/// Assign `target_extra` seats by largest remainder: remainder ↓, raw score ↓,
/// then canonical order (ascending key when no order slice was given).
fn distribute_leftovers<K: Ord + Clone>(
    target_extra: u32,
    alloc: &mut BTreeMap<K, u32>,
    remainders: &BTreeMap<K, u128>,
    scores: &BTreeMap<K, u64>,
    order_ix: Option<&BTreeMap<K, usize>>,
) {
    if target_extra == 0 || remainders.is_empty() {
        return;
    }
    let mut ranking = ranking_rows(remainders.keys().cloned(), remainders, scores, order_ix);
    ranking.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| b.2.cmp(&a.2))
            .then_with(|| match (a.3, b.3) {
                (usize::MAX, usize::MAX) => a.0.cmp(&b.0),
                (ia, ib) => ia.cmp(&ib),
            })
    });

    let n = ranking.len();
    let mut given = 0u32;
    let mut idx = 0usize;
    while given < target_extra {
        let key = &ranking[idx].0;
        *alloc.entry(key.clone()).or_insert(0) += 1;
        given += 1;
        idx += 1;
        if idx == n {
            idx = 0; // cycle if more leftovers than candidates (degenerate quotas)
        }
    }
}

/// Trim seats when floors over-allocate (rounded-quota edge) using the
/// inverse ranking: remainder ↑, raw score ↑, then canonical order.
fn trim_over_allocation<K: Ord + Clone>(
    target_seats: u32,
    alloc: &mut BTreeMap<K, u32>,
    remainders: &BTreeMap<K, u128>,
    scores: &BTreeMap<K, u64>,
    order_ix: Option<&BTreeMap<K, usize>>,
) {
    let mut total: u128 = alloc.values().map(|&s| s as u128).sum();
    if total <= target_seats as u128 {
        return;
    }

    // Only keys holding at least one seat can lose one.
    let holders: Vec<K> = alloc
        .iter()
        .filter_map(|(k, &s)| (s > 0).then(|| k.clone()))
        .collect();
    let mut ranking = ranking_rows(holders.into_iter(), remainders, scores, order_ix);
    ranking.sort_by(|a, b| {
        a.1.cmp(&b.1)
            .then_with(|| a.2.cmp(&b.2))
            .then_with(|| match (a.3, b.3) {
                (usize::MAX, usize::MAX) => a.0.cmp(&b.0),
                (ia, ib) => ia.cmp(&ib),
            })
    });
    if ranking.is_empty() {
        return;
    }

    let mut idx = 0usize;
    while total > target_seats as u128 {
        let key = &ranking[idx].0;
        if let Some(s) = alloc.get_mut(key) {
            if *s > 0 {
                *s -= 1;
                total -= 1;
            }
        }
        idx += 1;
        if idx == ranking.len() {
            idx = 0;
        }
    }
}
