//! # Error Types
//!
//! The engine is total over its valid domain, so only two things can go wrong:
//! a caller hands it a value it cannot reason about, or a contour table breaks
//! the ordering rules the interpolation depends on.

use thiserror::Error;

/// Errors raised by the contour table and the interpolation engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoudnessError {
    /// A non-finite or out-of-domain argument was passed to a conversion,
    /// or a phon index the table has no contour for.
    #[error("invalid {name}: {value}")]
    InvalidInput { name: &'static str, value: f64 },

    /// A contour table violates its invariants. Only raised at construction.
    #[error("contour table is inconsistent: {0}")]
    DataIntegrity(String),
}

pub type Result<T> = std::result::Result<T, LoudnessError>;

/// Rejects frequencies that are non-finite or not strictly positive.
pub(crate) fn check_frequency(frequency: f64) -> Result<f64> {
    if frequency.is_finite() && frequency > 0.0 {
        Ok(frequency)
    } else {
        Err(LoudnessError::InvalidInput { name: "frequency", value: frequency })
    }
}

/// Rejects NaN and infinities.
pub(crate) fn check_finite(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(LoudnessError::InvalidInput { name, value })
    }
}
