//! Seeded RNG for **ties only** (no OS entropy).
//!
//! Elections that break exact ties by lot still have to be replayable; the
//! drawing is a ChaCha20 stream keyed by an explicit seed, so a recorded
//! seed reproduces the whole evaluation bit-for-bit.

use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

/// Newtype over ChaCha20Rng for tie-breaking.
pub struct TieRng(ChaCha20Rng);

/// Create a tie RNG from an integer seed.
pub fn tie_rng_from_seed(seed: u64) -> TieRng {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&seed.to_le_bytes());
    TieRng(ChaCha20Rng::from_seed(bytes))
}

impl TieRng {
    /// Uniform draw in `[0, n)` via rejection sampling (no modulo bias).
    /// Returns `None` when `n == 0`.
    pub fn gen_range(&mut self, n: u64) -> Option<u64> {
        if n == 0 {
            return None;
        }
        let zone = u64::MAX - (u64::MAX % n);
        loop {
            let x = self.0.next_u64();
            if x < zone {
                return Some(x % n);
            }
        }
    }
}

impl Default for TieRng {
    fn default() -> Self {
        tie_rng_from_seed(0)
    }
}
