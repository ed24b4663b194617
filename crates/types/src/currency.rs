//! Native currency amounts.
//!
//! Amounts are unsigned arbitrary-precision integers counted in the smallest
//! unit. One whole token is 10¹⁸ smallest units.
//!
//! ## Encoding
//!
//! Amounts serialize as decimal strings so that values above `u64::MAX`
//! survive JSON and TOML untouched. Deserialization additionally accepts
//! `0x`-prefixed hexadecimal strings (the format used by genesis allocations)
//! and plain non-negative integers.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

/// Number of decimal places of the native token.
pub const TOKEN_DECIMALS: u32 = 18;

/// One whole token in smallest units, as a plain integer.
pub const UNITS_PER_TOKEN: u64 = 1_000_000_000_000_000_000;

/// Errors produced when parsing an amount from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount string is empty")]
    Empty,
    #[error("amount `{0}` is not a valid unsigned integer")]
    InvalidDigits(String),
}

/// Amount of the native token in smallest units.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(BigUint);

impl Amount {
    /// Zero amount
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    /// Create an amount from smallest units.
    pub fn from_units(units: u128) -> Self {
        Self(BigUint::from(units))
    }

    /// Create an amount from whole tokens.
    pub fn from_tokens(tokens: u64) -> Self {
        Self(BigUint::from(tokens) * BigUint::from(UNITS_PER_TOKEN))
    }

    /// Convert a signed request into an amount. Negative values yield `None`.
    pub fn from_signed(value: &BigInt) -> Option<Self> {
        value.to_biguint().map(Self)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Raw smallest units.
    pub fn units(&self) -> &BigUint {
        &self.0
    }

    /// Smallest units as `u128`, if they fit.
    pub fn to_u128(&self) -> Option<u128> {
        self.0.to_u128()
    }

    /// Big-endian byte encoding of the smallest units (empty for zero).
    pub fn to_bytes_be(&self) -> Vec<u8> {
        if self.0.is_zero() {
            Vec::new()
        } else {
            self.0.to_bytes_be()
        }
    }

    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        if other.0 > self.0 {
            None
        } else {
            Some(Amount(&self.0 - &other.0))
        }
    }

    pub fn saturating_sub(&self, other: &Amount) -> Amount {
        self.checked_sub(other).unwrap_or_default()
    }

    /// Floor half of the amount.
    pub fn half(&self) -> Amount {
        Amount(&self.0 >> 1u32)
    }

    /// Whole-token rendering with up to 18 fractional digits, trailing zeros
    /// trimmed. Intended for log output only.
    pub fn to_token_string(&self) -> String {
        let unit = BigUint::from(UNITS_PER_TOKEN);
        let whole = &self.0 / &unit;
        let fractional = &self.0 % &unit;

        if fractional.is_zero() {
            return whole.to_string();
        }

        let padded = format!("{:0>width$}", fractional.to_string(), width = TOKEN_DECIMALS as usize);
        format!("{whole}.{}", padded.trim_end_matches('0'))
    }
}

/// Shorthand for [`Amount::from_tokens`].
pub fn tokens(whole: u64) -> Amount {
    Amount::from_tokens(whole)
}

/// Parse a decimal or `0x`-prefixed hexadecimal amount of smallest units.
pub fn parse_amount(text: &str) -> Result<Amount, AmountError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AmountError::Empty);
    }

    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some("") => None,
        Some(hex_digits) => BigUint::parse_bytes(hex_digits.as_bytes(), 16),
        None if text.bytes().all(|b| b.is_ascii_digit()) => {
            BigUint::parse_bytes(text.as_bytes(), 10)
        }
        None => None,
    };

    parsed
        .map(Amount)
        .ok_or_else(|| AmountError::InvalidDigits(text.to_string()))
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_amount(s)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<BigUint> for Amount {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<Amount> for BigInt {
    fn from(value: Amount) -> Self {
        BigInt::from_biguint(Sign::Plus, value.0)
    }
}

impl From<&Amount> for BigInt {
    fn from(value: &Amount) -> Self {
        BigInt::from_biguint(Sign::Plus, value.0.clone())
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, other: Amount) -> Amount {
        Amount(self.0 + other.0)
    }
}

impl<'a> Add<&'a Amount> for &'a Amount {
    type Output = Amount;

    fn add(self, other: &'a Amount) -> Amount {
        Amount(&self.0 + &other.0)
    }
}

impl AddAssign<&Amount> for Amount {
    fn add_assign(&mut self, other: &Amount) {
        self.0 += &other.0;
    }
}

/// Panics on underflow; use [`Amount::checked_sub`] where the ordering is not
/// already established.
impl<'a> Sub<&'a Amount> for &'a Amount {
    type Output = Amount;

    fn sub(self, other: &'a Amount) -> Amount {
        Amount(&self.0 - &other.0)
    }
}

impl<'a> std::iter::Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Amount {
        iter.fold(Amount::zero(), |mut acc, item| {
            acc += item;
            acc
        })
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or a decimal/0x-hex string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount::from(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Amount, E> {
        Ok(Amount::from_units(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        u64::try_from(v)
            .map(Amount::from)
            .map_err(|_| E::custom(format!("amount must not be negative, got {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        parse_amount(v).map_err(E::custom)
    }
}
