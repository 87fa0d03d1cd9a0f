//! Highest-averages (divisor) apportionment per unit.
//!
//! Contract:
//! - Allocate `seats` sequentially by picking the max of v/divisor(s), where
//!   `s` is the count of seats already awarded to that candidate.
//! - Divisor sequences are selected by method: d'Hondt (1,2,3,…),
//!   Sainte-Laguë (1,3,5,…), modified Sainte-Laguë (1.4, then 3,5,…).
//!   Fractional first divisors are carried as exact rationals.
//! - Exact quotient ties resolved by explicit policy:
//!   DeterministicOrder → canonical order, Random → seeded `TieRng`.
//! - A candidate with zero votes never receives a seat while any candidate
//!   has positive votes; an all-zero vote vector follows `ZeroVotePolicy`.
//! - Pure integers; no division in comparisons (cross-multiply in u128).
//!
//! Determinism:
//! - Scans run in canonical order (the `order` slice when given, otherwise
//!   ascending key order).
//! - Random ties depend *only* on the provided `TieRng` stream.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use se_core::rng::TieRng;
use se_core::variables::{TiePolicy, ZeroVotePolicy};

use crate::AllocError;

/// Divisor sequence generator, selected by name.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DivisorMethod {
    DHondt,
    SainteLague,
    /// "Schepers" variant: first divisor 1.4 instead of 1, remaining odd.
    SainteLagueModified,
}

impl DivisorMethod {
    /// Divisor for `s` already-assigned seats, as an exact rational
    /// `(num, den)` so fractional first divisors stay integer-comparable.
    #[inline]
    pub fn divisor(self, s: u32) -> (u128, u128) {
        let s = s as u128;
        match self {
            DivisorMethod::DHondt => (s + 1, 1),
            DivisorMethod::SainteLague => (2 * s + 1, 1),
            DivisorMethod::SainteLagueModified => {
                if s == 0 {
                    (7, 5) // 1.4
                } else {
                    (2 * s + 1, 1)
                }
            }
        }
    }
}

/// Compare quotients v1/(n1/d1) vs v2/(n2/d2) via u128 cross-multiplication.
/// Each quotient is v*den/num; divisor numerators/denominators are small, so
/// the products stay far below u128::MAX.
#[inline]
fn cmp_quotients(v1: u64, div1: (u128, u128), v2: u64, div2: (u128, u128)) -> core::cmp::Ordering {
    let lhs = (v1 as u128) * div1.1 * div2.0;
    let rhs = (v2 as u128) * div2.1 * div1.0;
    lhs.cmp(&rhs)
}

/// Apportion `seats` among `scores` keys with the chosen divisor method.
///
/// Generic over the key: the same primitive serves candidate votes,
/// per-region population apportionment, and per-party regional list splits.
///
/// - `order`, when given, fixes the canonical scan/tie order; keys it omits
///   sort after it in ascending key order.
/// - `seats == 0` yields an all-zero mapping over the score keys.
/// - The awarded total always equals `seats` (checked; a mismatch is an
///   internal defect surfaced as `AllocError::TotalMismatch`).
pub fn highest_averages<K: Ord + Clone>(
    seats: u32,
    scores: &BTreeMap<K, u64>,
    order: Option<&[K]>,
    method: DivisorMethod,
    tie_policy: TiePolicy,
    zero_votes: ZeroVotePolicy,
    mut rng: Option<&mut TieRng>,
) -> Result<BTreeMap<K, u32>, AllocError> {
    let mut alloc: BTreeMap<K, u32> = scores.keys().cloned().map(|k| (k, 0)).collect();
    if seats == 0 {
        return Ok(alloc);
    }
    if scores.is_empty() {
        return Err(AllocError::NoCandidates);
    }
    if matches!(tie_policy, TiePolicy::Random) && rng.is_none() {
        return Err(AllocError::MissingRngForRandomPolicy);
    }

    let scan = canonical_scan(scores, order);

    let total: u128 = scores.values().map(|&v| v as u128).sum();
    if total == 0 {
        return match zero_votes {
            ZeroVotePolicy::Fail => Err(AllocError::AllVotesZero),
            ZeroVotePolicy::SplitEvenly => Ok(round_robin_even(seats, &scan)),
        };
    }

    for _round in 0..seats {
        let winner = next_award(&alloc, scores, &scan, method, tie_policy, rng.as_deref_mut());
        if let Some(slot) = alloc.get_mut(&scan[winner]) {
            *slot += 1;
        }
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

/// Canonical scan order: the `order` slice first (restricted to known keys),
/// then any remaining score keys ascending.
fn canonical_scan<K: Ord + Clone>(scores: &BTreeMap<K, u64>, order: Option<&[K]>) -> Vec<K> {
    let mut scan: Vec<K> = Vec::with_capacity(scores.len());
    if let Some(slice) = order {
        for k in slice {
            if scores.contains_key(k) && !scan.contains(k) {
                scan.push(k.clone());
            }
        }
    }
    for k in scores.keys() {
        if !scan.contains(k) {
            scan.push(k.clone());
        }
    }
    scan
}

/// Evenly distribute `seats` in a deterministic round-robin by canonical
/// order. Used only when the entire vote vector sums to zero.
fn round_robin_even<K: Ord + Clone>(seats: u32, scan: &[K]) -> BTreeMap<K, u32> {
    let n = scan.len() as u32;
    if n == 0 {
        return BTreeMap::new();
    }
    let base = seats / n;
    let rem = seats % n;
    scan.iter()
        .enumerate()
        .map(|(i, k)| {
            let extra = if (i as u32) < rem { 1 } else { 0 };
            (k.clone(), base + extra)
        })
        .collect()
}

/// Argmax of v/divisor across the scan order; index into `scan` of the
/// winner. Ties resolved per policy.
fn next_award<K: Ord + Clone>(
    seats_so_far: &BTreeMap<K, u32>,
    scores: &BTreeMap<K, u64>,
    scan: &[K],
    method: DivisorMethod,
    tie_policy: TiePolicy,
    rng: Option<&mut TieRng>,
) -> usize {
    // Track the current best quotient and tied indices (encounter order ==
    // canonical order).
    let mut best_ixs: Vec<usize> = Vec::new();
    let mut best_v: u64 = 0;
    let mut best_div: (u128, u128) = (1, 1);
    let mut have_best = false;

    for (ix, key) in scan.iter().enumerate() {
        let v = scores.get(key).copied().unwrap_or(0);
        let s = *seats_so_far.get(key).unwrap_or(&0);
        let div = method.divisor(s);

        if !have_best {
            have_best = true;
            best_v = v;
            best_div = div;
            best_ixs.clear();
            best_ixs.push(ix);
        } else {
            match cmp_quotients(v, div, best_v, best_div) {
                core::cmp::Ordering::Greater => {
                    best_v = v;
                    best_div = div;
                    best_ixs.clear();
                    best_ixs.push(ix);
                }
                core::cmp::Ordering::Equal => best_ixs.push(ix),
                core::cmp::Ordering::Less => {} // keep current best
            }
        }
    }

    debug_assert!(!best_ixs.is_empty(), "scan cannot be empty here");
    if best_ixs.len() == 1 {
        return best_ixs[0];
    }

    match tie_policy {
        // best_ixs is built in canonical order.
        TiePolicy::DeterministicOrder => best_ixs[0],
        TiePolicy::Random => {
            if let Some(rng) = rng {
                // Consume exactly k draws for a k-way tie; winner is min by
                // (draw, canonical rank).
                let mut best: Option<(u64, usize)> = None;
                for &ix in &best_ixs {
                    let ticket = rng.gen_range(u64::MAX).unwrap_or(0);
                    if best.map_or(true, |b| (ticket, ix) < b) {
                        best = Some((ticket, ix));
                    }
                }
                best.map(|(_, ix)| ix).unwrap_or(best_ixs[0])
            } else {
                // Unreachable: the entry point refuses Random without an RNG.
                best_ixs[0]
            }
        }
    }
}
