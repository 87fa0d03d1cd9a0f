//! Plurality selection: the top-N candidates by raw votes, in descending
//! vote order, with explicit tie policy. A selection carries no seat-count
//! semantics; lifting winners into a one-seat-each distribution happens in
//! `se_pipeline`.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use se_core::rng::TieRng;
use se_core::variables::TiePolicy;

use crate::AllocError;

/// Pick `seats` winners by descending vote count.
///
/// Ordering inside the result is by (votes ↓, canonical order); an exact tie
/// *across the cut line* is resolved per `tie_policy`. Zero-vote candidates
/// can win only when every candidate has zero votes, and then only via an
/// explicit canonical-order pick, never silently.
pub fn plurality_winners<K: Ord + Clone>(
    seats: u32,
    scores: &BTreeMap<K, u64>,
    order: Option<&[K]>,
    tie_policy: TiePolicy,
    mut rng: Option<&mut TieRng>,
) -> Result<Vec<K>, AllocError> {
    if seats == 0 {
        return Ok(Vec::new());
    }
    if scores.is_empty() {
        return Err(AllocError::NoCandidates);
    }
    if matches!(tie_policy, TiePolicy::Random) && rng.is_none() {
        return Err(AllocError::MissingRngForRandomPolicy);
    }

    // Canonical scan order: the order slice first, then remaining keys.
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

    // Stable rank: votes ↓, canonical position ↑, except that candidates
    // tied exactly at the cut line are reordered per policy first.
    let mut ranked: Vec<(usize, u64)> = scan
        .iter()
        .enumerate()
        .map(|(ix, k)| (ix, scores.get(k).copied().unwrap_or(0)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let take = (seats as usize).min(ranked.len());
    if take < ranked.len() {
        let cut_votes = ranked[take - 1].1;
        if ranked[take].1 == cut_votes {
            // Tie across the cut line: reorder the tied block per policy.
            let lo = ranked
                .iter()
                .position(|&(_, v)| v == cut_votes)
                .unwrap_or(take - 1);
            let hi = ranked
                .iter()
                .rposition(|&(_, v)| v == cut_votes)
                .unwrap_or(take);
            match tie_policy {
                TiePolicy::DeterministicOrder => {
                    // Already in canonical order within the block.
                }
                TiePolicy::Random => {
                    if let Some(rng) = rng.as_deref_mut() {
                        // One draw per tied candidate; sort by (ticket, rank).
                        let mut tickets: Vec<(u64, usize, u64)> = ranked[lo..=hi]
                            .iter()
                            .map(|&(ix, v)| (rng.gen_range(u64::MAX).unwrap_or(0), ix, v))
                            .collect();
                        tickets.sort();
                        for (slot, &(_, ix, v)) in tickets.iter().enumerate() {
                            ranked[lo + slot] = (ix, v);
                        }
                    }
                }
            }
        }
    }

    Ok(ranked
        .into_iter()
        .take(take)
        .map(|(ix, _)| scan[ix].clone())
        .collect())
}
