//! Candidate identity: a closed two-case sum type (party | coalition).
//!
//! Candidates are immutable value keys: equality/ordering/hashing cover the
//! variant, the display name, and (for coalitions) the ordered member list,
//! so the same logical party is interchangeable across vote stages.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::errors::CoreError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const NAME_MIN_LEN: usize = 1;
const NAME_MAX_LEN: usize = 200;

#[inline]
fn is_valid_name(s: &str) -> bool {
    let len = s.chars().count();
    (NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len)
}

/// A single electable entity: a standalone party, or a coalition of member
/// candidates. The coalition member count is itself significant data: it
/// drives member-count-dependent entry thresholds.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Candidate {
    Party(String),
    Coalition {
        name: String,
        /// Ordered, non-empty member list.
        members: Vec<Candidate>,
    },
}

impl Candidate {
    /// Construct a standalone party, validating the name.
    pub fn party(name: impl Into<String>) -> Result<Self, CoreError> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(CoreError::InvalidName);
        }
        Ok(Candidate::Party(name))
    }

    /// Construct a coalition from a name and a non-empty ordered member list.
    pub fn coalition(
        name: impl Into<String>,
        members: Vec<Candidate>,
    ) -> Result<Self, CoreError> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(CoreError::InvalidName);
        }
        if members.is_empty() {
            return Err(CoreError::EmptyCoalition);
        }
        Ok(Candidate::Coalition { name, members })
    }

    /// Display name of the candidate.
    #[inline]
    pub fn name(&self) -> &str {
        match self {
            Candidate::Party(name) => name,
            Candidate::Coalition { name, .. } => name,
        }
    }

    /// Number of member parties: 1 for a standalone party, the member list
    /// length for a coalition. Used by bracketed entry thresholds.
    #[inline]
    pub fn member_count(&self) -> usize {
        match self {
            Candidate::Party(_) => 1,
            Candidate::Coalition { members, .. } => members.len(),
        }
    }

    /// Member view: a standalone party has no listed members.
    #[inline]
    pub fn members(&self) -> &[Candidate] {
        match self {
            Candidate::Party(_) => &[],
            Candidate::Coalition { members, .. } => members,
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
