//! Vote and seat mappings, flat or nested by region.
//!
//! Invariants:
//! - Values are non-negative by construction (`u64` votes, `u32` seats).
//! - Merging/flattening takes the union of candidate keys and sums values on
//!   collision; candidates absent from some regions count as zero there.
//! - No operation mutates its input; every reshaping produces a fresh map.

use alloc::collections::{BTreeMap, BTreeSet};
use core::fmt;

use crate::candidate::Candidate;
use crate::errors::CoreError;
use crate::tokens::RegionId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Raw vote counts, either flat (candidate → votes) or nested by region to
/// arbitrary depth. Depth is an explicit parameter of whichever combinator
/// consumes the mapping, never guessed.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Votes {
    Flat(BTreeMap<Candidate, u64>),
    ByRegion(BTreeMap<RegionId, Votes>),
}

/// Awarded seats, shaped like [`Votes`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Seats {
    Flat(BTreeMap<Candidate, u32>),
    ByRegion(BTreeMap<RegionId, Seats>),
}

impl Votes {
    /// Flat view; `Err` when the mapping is nested.
    pub fn as_flat(&self) -> Result<&BTreeMap<Candidate, u64>, CoreError> {
        match self {
            Votes::Flat(m) => Ok(m),
            Votes::ByRegion(_) => Err(CoreError::ShapeMismatch("expected flat votes")),
        }
    }

    /// Per-region view; `Err` when the mapping is flat.
    pub fn as_regions(&self) -> Result<&BTreeMap<RegionId, Votes>, CoreError> {
        match self {
            Votes::ByRegion(m) => Ok(m),
            Votes::Flat(_) => Err(CoreError::ShapeMismatch("expected nested votes")),
        }
    }

    /// Nesting depth: 0 for flat, 1 + child depth otherwise. All sibling
    /// branches must agree; ragged structures are rejected.
    pub fn depth(&self) -> Result<usize, CoreError> {
        match self {
            Votes::Flat(_) => Ok(0),
            Votes::ByRegion(m) => {
                let mut depth: Option<usize> = None;
                for child in m.values() {
                    let d = child.depth()?;
                    match depth {
                        None => depth = Some(d),
                        Some(seen) if seen != d => return Err(CoreError::RaggedNesting),
                        Some(_) => {}
                    }
                }
                Ok(1 + depth.unwrap_or(0))
            }
        }
    }

    /// Collapse all regional structure by summation into one flat mapping.
    /// Identity on flat input (copied).
    pub fn flattened(&self) -> BTreeMap<Candidate, u64> {
        let mut out: BTreeMap<Candidate, u64> = BTreeMap::new();
        self.fold_into(&mut out);
        out
    }

    fn fold_into(&self, out: &mut BTreeMap<Candidate, u64>) {
        match self {
            Votes::Flat(m) => {
                for (cand, &v) in m {
                    let slot = out.entry(cand.clone()).or_insert(0);
                    *slot = slot.saturating_add(v);
                }
            }
            Votes::ByRegion(m) => {
                for child in m.values() {
                    child.fold_into(out);
                }
            }
        }
    }

    /// Restrict to an admitted candidate subset, recursively. Excluded
    /// candidates disappear from the mapping (destructive elimination).
    pub fn restricted(&self, keep: &BTreeSet<Candidate>) -> Votes {
        match self {
            Votes::Flat(m) => Votes::Flat(
                m.iter()
                    .filter(|(cand, _)| keep.contains(*cand))
                    .map(|(cand, &v)| (cand.clone(), v))
                    .collect(),
            ),
            Votes::ByRegion(m) => Votes::ByRegion(
                m.iter()
                    .map(|(region, child)| (region.clone(), child.restricted(keep)))
                    .collect(),
            ),
        }
    }

    /// Total votes across the whole structure (u128 accumulator).
    pub fn total(&self) -> u128 {
        match self {
            Votes::Flat(m) => m.values().map(|&v| v as u128).sum(),
            Votes::ByRegion(m) => m.values().map(|child| child.total()).sum(),
        }
    }
}

impl Seats {
    pub fn as_flat(&self) -> Result<&BTreeMap<Candidate, u32>, CoreError> {
        match self {
            Seats::Flat(m) => Ok(m),
            Seats::ByRegion(_) => Err(CoreError::ShapeMismatch("expected flat seats")),
        }
    }

    pub fn as_regions(&self) -> Result<&BTreeMap<RegionId, Seats>, CoreError> {
        match self {
            Seats::ByRegion(m) => Ok(m),
            Seats::Flat(_) => Err(CoreError::ShapeMismatch("expected nested seats")),
        }
    }

    /// Sum seats across all regions per candidate into one flat mapping.
    pub fn merged(&self) -> BTreeMap<Candidate, u32> {
        let mut out: BTreeMap<Candidate, u32> = BTreeMap::new();
        self.fold_into(&mut out);
        out
    }

    fn fold_into(&self, out: &mut BTreeMap<Candidate, u32>) {
        match self {
            Seats::Flat(m) => {
                for (cand, &s) in m {
                    let slot = out.entry(cand.clone()).or_insert(0);
                    *slot = slot.saturating_add(s);
                }
            }
            Seats::ByRegion(m) => {
                for child in m.values() {
                    child.fold_into(out);
                }
            }
        }
    }

    /// Total seats across the whole structure (u128 accumulator).
    pub fn total(&self) -> u128 {
        match self {
            Seats::Flat(m) => m.values().map(|&s| s as u128).sum(),
            Seats::ByRegion(m) => m.values().map(|child| child.total()).sum(),
        }
    }
}

impl From<BTreeMap<Candidate, u64>> for Votes {
    fn from(m: BTreeMap<Candidate, u64>) -> Self {
        Votes::Flat(m)
    }
}

impl From<BTreeMap<Candidate, u32>> for Seats {
    fn from(m: BTreeMap<Candidate, u32>) -> Self {
        Seats::Flat(m)
    }
}

impl fmt::Display for Seats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seats::Flat(m) => {
                let mut first = true;
                for (cand, s) in m {
                    if !first {
                        write!(f, ", ")?;
                    }
                    write!(f, "{cand}: {s}")?;
                    first = false;
                }
                Ok(())
            }
            Seats::ByRegion(m) => {
                for (region, child) in m {
                    writeln!(f, "{region}: {child}")?;
                }
                Ok(())
            }
        }
    }
}
