//! se_core — Core types for the seat apportionment engine.
//!
//! This crate is **I/O-free**. It defines stable types/APIs used across the
//! engine (`se_algo`, `se_pipeline`):
//!
//! - Candidate identity: `Candidate` (party | coalition)
//! - Region tokens: `RegionId`
//! - Vote/seat mappings, flat or nested by region: `Votes`, `Seats`
//! - Integer-first numerics & exact ratio helpers (half-even rounding)
//! - Deterministic ordering helpers
//! - Seedable RNG (ChaCha20) for **ties only**
//!
//! Serialization derives are gated behind the `serde` feature.

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod ballots;
pub mod candidate;
pub mod determinism;
pub mod errors;
pub mod rng;
pub mod rounding;
pub mod tokens;
pub mod variables;

pub use ballots::{Seats, Votes};
pub use candidate::Candidate;
pub use errors::CoreError;
pub use tokens::RegionId;
pub use variables::{TiePolicy, ZeroVotePolicy};
