//! Type-safe money representation using decimal arithmetic.
//!
//! Amounts are never stored as floating point. The remote API sends prices as
//! JSON numbers; they are parsed straight into [`Decimal`].

use std::iter::Sum;
use std::ops::Add;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::quantity::Quantity;

/// An amount of money with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create an amount in the default currency.
    #[must_use]
    pub fn from_decimal(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::default())
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Multiply a unit price by a quantity.
    #[must_use]
    pub fn times(self, quantity: Quantity) -> Self {
        Self::new(
            self.amount * Decimal::from(quantity.get()),
            self.currency_code,
        )
    }

    /// Amount rounded to two decimals, without currency symbol (e.g., `50.00`).
    ///
    /// This is the format the payments endpoint expects for `totalAmount`.
    #[must_use]
    pub fn to_fixed(&self) -> String {
        let rounded = self
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        format!("{rounded:.2}")
    }

    /// Whether the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero(CurrencyCode::default())
    }
}

impl Add for Money {
    type Output = Self;

    /// Adds amounts; the result keeps the left-hand currency.
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.amount + rhs.amount, self.currency_code)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        let mut iter = iter;
        iter.next()
            .map_or_else(Self::default, |first| iter.fold(first, Add::add))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.currency_code.symbol(), self.to_fixed())
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    MXN,
    EUR,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::MXN => "$",
            Self::EUR => "€",
        }
    }

    /// Three-letter code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::MXN => "MXN",
            Self::EUR => "EUR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(cents: i64) -> Money {
        Money::from_decimal(Decimal::new(cents, 2))
    }

    #[test]
    fn test_times_quantity() {
        let unit = usd(1000);
        assert_eq!(unit.times(Quantity::clamped(5)), usd(5000));
    }

    #[test]
    fn test_sum_of_empty_is_zero() {
        let total: Money = std::iter::empty().sum();
        assert!(total.is_zero());
    }

    #[test]
    fn test_sum_keeps_currency() {
        let a = Money::new(Decimal::new(150, 2), CurrencyCode::MXN);
        let b = Money::new(Decimal::new(250, 2), CurrencyCode::MXN);
        let total: Money = [a, b].into_iter().sum();
        assert_eq!(total, Money::new(Decimal::new(400, 2), CurrencyCode::MXN));
    }

    #[test]
    fn test_display_and_fixed() {
        assert_eq!(usd(5000).to_string(), "$50.00");
        assert_eq!(Money::from_decimal(Decimal::new(5, 0)).to_fixed(), "5.00");
        assert_eq!(Money::from_decimal(Decimal::new(12345, 3)).to_fixed(), "12.35");
    }

    #[test]
    fn test_equality_ignores_scale() {
        assert_eq!(usd(5000), Money::from_decimal(Decimal::new(50, 0)));
    }
}
