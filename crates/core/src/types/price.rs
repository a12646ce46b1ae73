//! Type-safe price representation using decimal arithmetic.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    /// South African rand, the store currency.
    #[default]
    ZAR,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::ZAR => "R",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }
}

/// A monetary amount in the store currency.
///
/// The marketplace trades in a single currency, so prices carry the currency
/// for display but arithmetic never mixes currencies: every `Price` built by
/// [`Price::new`] is in [`CurrencyCode::ZAR`].
///
/// ```
/// use rust_decimal::Decimal;
/// use shopdrop_core::Price;
///
/// let eggs = Price::new(Decimal::new(7200, 2));
/// assert_eq!((eggs * 2).to_string(), "R144.00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., rand, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price in the store currency.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self {
            amount,
            currency_code: CurrencyCode::ZAR,
        }
    }

    /// Create a price from an amount in cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self::new(Decimal::new(cents, 2))
    }

    /// The zero amount.
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(Decimal::ZERO)
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Whether the amount is negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative()
    }

    /// Sum of two prices, or `None` if the amount would overflow.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        Some(Self {
            amount: self.amount.checked_add(rhs.amount)?,
            currency_code: self.currency_code,
        })
    }

    /// `self × quantity`, or `None` if the amount would overflow.
    #[must_use]
    pub fn checked_mul(self, quantity: u32) -> Option<Self> {
        Some(Self {
            amount: self.amount.checked_mul(Decimal::from(quantity))?,
            currency_code: self.currency_code,
        })
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:.2}",
            self.currency_code.symbol(),
            self.amount.round_dp(2)
        )
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            amount: self.amount + rhs.amount,
            currency_code: self.currency_code,
        }
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, quantity: u32) -> Self {
        Self {
            amount: self.amount * Decimal::from(quantity),
            currency_code: self.currency_code,
        }
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        assert_eq!(Price::from_cents(17100), Price::new(Decimal::from(171)));
        assert_eq!(Price::from_cents(-250).amount, Decimal::new(-250, 2));
    }

    #[test]
    fn test_display_uses_rand_symbol() {
        assert_eq!(Price::new(Decimal::new(7650, 2)).to_string(), "R76.50");
        assert_eq!(Price::zero().to_string(), "R0.00");
    }

    #[test]
    fn test_sum_and_mul() {
        let total: Price = [Price::from_cents(7200), Price::from_cents(9900) * 2]
            .into_iter()
            .sum();
        assert_eq!(total, Price::from_cents(27000));
    }

    #[test]
    fn test_checked_arithmetic_reports_overflow() {
        let huge = Price::new(Decimal::MAX);
        assert_eq!(huge.checked_mul(2), None);
        assert_eq!(huge.checked_add(Price::from_cents(1)), None);
        assert_eq!(
            Price::from_cents(7200).checked_mul(2),
            Some(Price::from_cents(14400))
        );
        assert_eq!(
            Price::from_cents(7200).checked_add(Price::from_cents(9900)),
            Some(Price::from_cents(17100))
        );
    }

    #[test]
    fn test_sum_of_nothing_is_zero() {
        let total: Price = core::iter::empty().sum();
        assert!(total.is_zero());
    }
}
