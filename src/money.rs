// Money - signed amount in integer cents
//
// All arithmetic in the crate happens on cents. Decimal values only appear at
// the boundary: parsing user/JSON input and formatting output.

use crate::error::ValidationError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

/// Signed monetary amount in cents (USD, single currency).
///
/// ```
/// use cash_drawer::Money;
///
/// let amount = Money::from_cents(34_550);
/// assert_eq!(amount.to_string(), "$345.50");
/// assert_eq!(amount.to_decimal_string(), "345.50");
/// assert_eq!("45.505".parse::<Money>().unwrap().cents(), 4551);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub const fn abs(self) -> Money {
        Money(self.0.abs())
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// `self × count`, `None` on overflow.
    pub fn checked_times(self, count: u32) -> Option<Money> {
        self.0.checked_mul(i64::from(count)).map(Money)
    }

    /// Parse a decimal amount, rounding half-up (midpoint away from zero) to
    /// two fractional digits. A leading `$` is accepted.
    pub fn parse_decimal(input: &str) -> Result<Money, ValidationError> {
        let invalid = || ValidationError::InvalidAmount(input.to_string());

        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed).trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let value = Decimal::from_str(trimmed).map_err(|_| invalid())?;
        Self::from_decimal(value).ok_or_else(invalid)
    }

    /// Convert a JSON-style floating point amount. The shortest decimal
    /// representation of the float is what gets rounded, so `45.505` becomes
    /// 4551 cents rather than whatever the binary expansion suggests.
    pub fn from_f64_rounded(value: f64) -> Result<Money, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::InvalidAmount(value.to_string()));
        }
        Self::parse_decimal(&value.to_string())
    }

    fn from_decimal(value: Decimal) -> Option<Money> {
        let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        rounded
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_i64())
            .map(Money)
    }

    /// Boundary representation: two fractional digits, no currency sign.
    pub fn to_decimal_string(self) -> String {
        Decimal::new(self.0, 2).to_string()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse_decimal(s)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

// ============================================================================
// SERDE (decimal strings on the wire)
// ============================================================================

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AmountInput {
    Number(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parsed = match AmountInput::deserialize(deserializer)? {
            AmountInput::Number(value) => Money::from_f64_rounded(value),
            AmountInput::Text(text) => Money::parse_decimal(&text),
        };
        parsed.map_err(serde::de::Error::custom)
    }
}
