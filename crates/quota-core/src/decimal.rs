//! Precision-safe decimal types for quota accounting.
//!
//! Uses `rust_decimal` for exact decimal arithmetic. Quota comparisons happen
//! right at the limit boundary, where a floating-point rounding error could
//! turn a rejection into an approval.

use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};
use std::str::FromStr;

/// Number of decimal places accepted for amounts and prices.
///
/// Counters are stored as integer minor units (`amount * 10^AMOUNT_SCALE`).
pub const AMOUNT_SCALE: u32 = 4;

/// Monetary amount with exact decimal precision.
///
/// Used for trade notionals, daily limits and daily-traded totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Amount(pub Decimal);

impl Amount {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Whether the value can be represented in minor units without rounding.
    #[inline]
    pub fn fits_scale(&self) -> bool {
        self.0.normalize().scale() <= AMOUNT_SCALE
    }

    /// Convert to integer minor units.
    ///
    /// Returns `None` if the value has more than `AMOUNT_SCALE` decimal places
    /// or does not fit in an `i64`.
    pub fn to_minor_units(&self) -> Option<i64> {
        if !self.fits_scale() {
            return None;
        }
        let mut scaled = self.0;
        scaled.rescale(AMOUNT_SCALE);
        i64::try_from(scaled.mantissa()).ok()
    }

    /// Build from integer minor units.
    #[inline]
    pub fn from_minor_units(units: i64) -> Self {
        Self(Decimal::new(units, AMOUNT_SCALE).normalize())
    }

    /// Subtract, flooring the result at zero.
    #[inline]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        if rhs.0 >= self.0 {
            Self::ZERO
        } else {
            Self(self.0 - rhs.0)
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(parse_exact(s)?))
    }
}

impl From<Decimal> for Amount {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl From<u32> for Amount {
    fn from(v: u32) -> Self {
        Self(Decimal::from(v))
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Amount {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ExactDecimalVisitor).map(Self)
    }
}

/// Unit price with exact decimal precision.
///
/// Carried through to the audit trail; quota checks only look at `Amount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(parse_exact(s)?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ExactDecimalVisitor).map(Self)
    }
}

fn parse_exact(s: &str) -> Result<Decimal, rust_decimal::Error> {
    let s = s.trim();
    if s.contains(['e', 'E']) {
        Decimal::from_scientific(s)
    } else {
        Decimal::from_str_exact(s)
    }
}

/// Accepts JSON numbers and numeric strings.
///
/// Floats are converted through their shortest round-trip representation,
/// so `0.1` becomes exactly `0.1` rather than its binary expansion.
struct ExactDecimalVisitor;

impl<'de> Visitor<'de> for ExactDecimalVisitor {
    type Value = Decimal;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal number or numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
        Ok(Decimal::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
        Ok(Decimal::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Decimal, E> {
        if !v.is_finite() {
            return Err(E::custom("non-finite number"));
        }
        parse_exact(&v.to_string()).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
        parse_exact(v).map_err(E::custom)
    }
}
