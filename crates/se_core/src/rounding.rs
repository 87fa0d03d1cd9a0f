//! Integer-first ratio helpers with banker's rounding (half-to-even).
//!
//! - Pure integer math; no floats, no I/O.
//! - Deterministic across OS/arch.
//! - Rounding only where explicitly allowed (nearest-even quota rounding).

use core::cmp::Ordering;

use crate::errors::CoreError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[inline]
fn gcd_u128(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    if a == 0 {
        1
    } else {
        a
    }
}

/// Exact non-negative fraction with positive denominator, reduced by GCD.
/// Used for entry thresholds (e.g. 5% = 1/20) and fractional divisors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Fraction {
    num: u64,
    den: u64,
}

impl Fraction {
    /// Construct a fraction, ensuring `den > 0` and reducing by GCD.
    pub fn new(num: u64, den: u64) -> Result<Self, CoreError> {
        if den == 0 {
            return Err(CoreError::InvalidRatio);
        }
        let g = gcd_u128(num as u128, den as u128) as u64;
        Ok(Fraction {
            num: num / g,
            den: den / g,
        })
    }

    #[inline]
    pub fn num(&self) -> u64 {
        self.num
    }

    #[inline]
    pub fn den(&self) -> u64 {
        self.den
    }
}

/// Compare a/b vs c/d exactly via u128 cross-multiplication.
/// Denominators must be positive; values are bounded by u64 so the
/// cross products cannot overflow u128.
#[inline]
pub fn cmp_ratio(a_num: u64, a_den: u64, b_num: u64, b_den: u64) -> Ordering {
    let lhs = (a_num as u128) * (b_den as u128);
    let rhs = (b_num as u128) * (a_den as u128);
    lhs.cmp(&rhs)
}

/// `value / total >= frac`? Exact, cross-multiplied. `total == 0` never
/// meets a threshold (prevents qualification by tie-break alone).
#[inline]
pub fn ge_fraction(value: u128, total: u128, frac: Fraction) -> bool {
    total > 0 && value.saturating_mul(frac.den as u128) >= total.saturating_mul(frac.num as u128)
}

/// Strict variant of [`ge_fraction`].
#[inline]
pub fn gt_fraction(value: u128, total: u128, frac: Fraction) -> bool {
    total > 0 && value.saturating_mul(frac.den as u128) > total.saturating_mul(frac.num as u128)
}

/// Round `num / den` to the nearest integer, ties to even (banker's).
pub fn round_nearest_even_int(num: u128, den: u128) -> Result<u128, CoreError> {
    if den == 0 {
        return Err(CoreError::InvalidRatio);
    }
    let q = num / den;
    let r = num % den;
    // Compare 2r against den without division.
    let twice = r.saturating_mul(2);
    let up = match twice.cmp(&den) {
        Ordering::Less => false,
        Ordering::Greater => true,
        Ordering::Equal => q % 2 == 1, // exact half: round to even
    };
    Ok(if up { q + 1 } else { q })
}
