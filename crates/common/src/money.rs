//! Fixed-precision monetary amounts.

use std::fmt;
use std::ops::Add;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of fractional digits every amount is rounded to.
pub const DECIMAL_PLACES: u32 = 2;

/// Monetary amount in the single implicit currency.
///
/// Every constructor and every arithmetic operation rounds the result to
/// [`DECIMAL_PLACES`] using half-away-from-zero, so `10.5555` becomes `10.56`
/// and `10.005` becomes `10.01`. Negative amounts are representable; callers
/// enforce non-negativity where they need it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money {
    amount: Decimal,
}

impl Money {
    /// Creates a money amount, rounding to two decimal places.
    pub fn new(amount: Decimal) -> Self {
        Self {
            amount: amount.round_dp_with_strategy(
                DECIMAL_PLACES,
                RoundingStrategy::MidpointAwayFromZero,
            ),
        }
    }

    /// Creates a money amount from a float.
    ///
    /// Non-finite input yields zero.
    pub fn from_f64(amount: f64) -> Self {
        Self::new(Decimal::from_f64(amount).unwrap_or_default())
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Returns the rounded decimal amount.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Adds another amount, re-rounding the sum. Saturates on overflow.
    pub fn add(&self, other: Money) -> Money {
        Money::new(self.amount.saturating_add(other.amount))
    }

    /// Multiplies by an integer factor such as a quantity. Saturates on
    /// overflow.
    pub fn multiply(&self, factor: i32) -> Money {
        Money::new(self.amount.saturating_mul(Decimal::from(factor)))
    }

    /// Adds another amount, or `None` on overflow.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.amount.checked_add(other.amount).map(Money::new)
    }

    /// Multiplies by an integer factor, or `None` on overflow.
    pub fn checked_multiply(&self, factor: i32) -> Option<Money> {
        self.amount
            .checked_mul(Decimal::from(factor))
            .map(Money::new)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money::new(amount)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money::add(&self, rhs)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.amount)
    }
}

// Wire format is a plain JSON number; deserialization goes back through the
// same rounding rule as construction.
impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.amount, serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = rust_decimal::serde::float::deserialize(deserializer)?;
        Ok(Money::new(amount))
    }
}
