//! Positive line quantities.
//!
//! A cart line or order never holds fewer than one unit. Callers that compute
//! a quantity from user input go through [`Quantity::clamped`], which pulls any
//! lower value up to one; removing a line is always an explicit operation.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a raw value is not a valid quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QuantityError {
    /// Zero or negative.
    #[error("quantity must be at least 1 (got {0})")]
    NotPositive(i64),
    /// Larger than the supported maximum.
    #[error("quantity {0} is too large")]
    TooLarge(i64),
}

/// A quantity of at least one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// One unit.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Build a quantity, clamping anything below one up to one.
    ///
    /// Values above `u32::MAX` saturate.
    #[must_use]
    pub fn clamped(raw: i64) -> Self {
        let bounded = u32::try_from(raw.max(1)).unwrap_or(u32::MAX);
        NonZeroU32::new(bounded).map_or(Self::ONE, Self)
    }

    /// Build a quantity, rejecting values below one.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError` if the value is not positive or does not fit.
    pub fn new(raw: i64) -> Result<Self, QuantityError> {
        if raw < 1 {
            return Err(QuantityError::NotPositive(raw));
        }
        u32::try_from(raw)
            .ok()
            .and_then(NonZeroU32::new)
            .map(Self)
            .ok_or(QuantityError::TooLarge(raw))
    }

    /// The number of units.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.get()
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_pulls_up_to_one() {
        assert_eq!(Quantity::clamped(0), Quantity::ONE);
        assert_eq!(Quantity::clamped(-7), Quantity::ONE);
        assert_eq!(Quantity::clamped(i64::MIN), Quantity::ONE);
        assert_eq!(Quantity::clamped(3).get(), 3);
    }

    #[test]
    fn test_clamped_saturates() {
        assert_eq!(Quantity::clamped(i64::MAX).get(), u32::MAX);
    }

    #[test]
    fn test_new_rejects_non_positive() {
        assert_eq!(Quantity::new(0), Err(QuantityError::NotPositive(0)));
        assert_eq!(Quantity::new(-1), Err(QuantityError::NotPositive(-1)));
        assert!(Quantity::new(1).is_ok());
    }

    #[test]
    fn test_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        let q: Quantity = serde_json::from_str("4").unwrap_or_default();
        assert_eq!(q.get(), 4);
    }
}
