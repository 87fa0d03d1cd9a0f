//! Minimal error set for core-domain validation.

use core::fmt;

/// Errors raised by core type constructors and shape accessors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CoreError {
    InvalidToken,
    InvalidName,
    EmptyCoalition,
    InvalidRatio,
    /// A flat mapping was expected but a nested one was found (or vice versa).
    ShapeMismatch(&'static str),
    /// Sibling branches of a nested mapping disagree on nesting depth.
    RaggedNesting,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::InvalidToken => write!(f, "invalid token"),
            CoreError::InvalidName => write!(f, "invalid name"),
            CoreError::EmptyCoalition => write!(f, "coalition has no members"),
            CoreError::InvalidRatio => write!(f, "invalid ratio"),
            CoreError::ShapeMismatch(k) => write!(f, "shape mismatch: {k}"),
            CoreError::RaggedNesting => write!(f, "ragged nesting depth"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CoreError {}
