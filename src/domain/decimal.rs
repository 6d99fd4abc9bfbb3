//! Exact base-10 decimal type backed by bigdecimal.
//!
//! Raw on-chain amounts are uint256 fixed-point integers; converting them to
//! human units is always `decimal(raw) / scale(decimals)` followed by a
//! truncation to the precision of the entity field being written.

use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, RoundingMode, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::primitives::RawUint;

/// Decimal places of a protocol mantissa (rates, indexes, factors).
pub const MANTISSA_DECIMALS: u32 = 18;

/// Precision that market-token amounts are truncated to.
pub const MARKET_TOKEN_DECIMALS: u32 = 8;

/// Total decimal places of an oracle price relative to an 18-decimal reference unit.
pub const ORACLE_DECIMALS: u32 = 36;

/// Returns 10^n.
pub fn scale(n: u32) -> Decimal {
    Decimal(BigDecimal::new(BigInt::from(1), -i64::from(n)))
}

/// Arbitrary-precision decimal for every derived accounting field.
///
/// Equality and ordering compare numeric value, so `1.50 == 1.5`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Decimal(BigDecimal);

impl Decimal {
    /// Wrap a BigDecimal.
    pub fn new(value: BigDecimal) -> Self {
        Decimal(value)
    }

    /// Convert a raw fixed-point integer into units: `raw / 10^decimals`, exactly.
    pub fn from_raw(raw: &RawUint, decimals: u32) -> Self {
        Decimal(BigDecimal::new(raw.as_bigint().clone(), i64::from(decimals)))
    }

    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, bigdecimal::ParseBigDecimalError> {
        BigDecimal::from_str(s).map(Decimal)
    }

    /// Keep at most `digits` fractional digits, rounding toward zero.
    pub fn truncate(&self, digits: u32) -> Self {
        let (_, current) = self.0.as_bigint_and_exponent();
        if current <= i64::from(digits) {
            return self.clone();
        }
        Decimal(self.0.with_scale_round(i64::from(digits), RoundingMode::Down))
    }

    /// Division that yields `None` for a zero divisor.
    pub fn checked_div(&self, rhs: &Decimal) -> Option<Decimal> {
        if rhs.is_zero() {
            None
        } else {
            Some(Decimal(&self.0 / &rhs.0))
        }
    }

    /// Format without exponent notation and without trailing zeros.
    pub fn to_canonical_string(&self) -> String {
        let (digits, exp) = self.0.normalized().as_bigint_and_exponent();
        let negative = digits < BigInt::from(0);
        let magnitude = if negative { -digits } else { digits }.to_string();

        let body = if exp <= 0 {
            if magnitude == "0" {
                magnitude
            } else {
                format!("{}{}", magnitude, "0".repeat(exp.unsigned_abs() as usize))
            }
        } else {
            let exp = exp as usize;
            if magnitude.len() > exp {
                let (int_part, frac_part) = magnitude.split_at(magnitude.len() - exp);
                format!("{}.{}", int_part, frac_part)
            } else {
                format!("0.{}{}", "0".repeat(exp - magnitude.len()), magnitude)
            }
        };

        if negative {
            format!("-{}", body)
        } else {
            body
        }
    }

    /// Number of fractional digits in the normalized value.
    pub fn fractional_digits(&self) -> u32 {
        let (_, exp) = self.0.normalized().as_bigint_and_exponent();
        exp.max(0) as u32
    }

    pub fn inner(&self) -> &BigDecimal {
        &self.0
    }

    /// The additive identity (0).
    pub fn zero() -> Self {
        Decimal(BigDecimal::zero())
    }

    pub fn one() -> Self {
        Decimal(BigDecimal::from(1))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        self.0 > BigDecimal::zero()
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = bigdecimal::ParseBigDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<u64> for Decimal {
    fn from(value: u64) -> Self {
        Decimal(BigDecimal::from(value))
    }
}

impl From<BigDecimal> for Decimal {
    fn from(value: BigDecimal) -> Self {
        Decimal(value)
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical_string())
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Decimal::from_str_canonical(&s).map_err(serde::de::Error::custom)
    }
}

// Arithmetic operations
impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl<'a> std::ops::Add<&'a Decimal> for &'a Decimal {
    type Output = Decimal;

    fn add(self, rhs: &'a Decimal) -> Decimal {
        Decimal(&self.0 + &rhs.0)
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl<'a> std::ops::Sub<&'a Decimal> for &'a Decimal {
    type Output = Decimal;

    fn sub(self, rhs: &'a Decimal) -> Decimal {
        Decimal(&self.0 - &rhs.0)
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

impl<'a> std::ops::Mul<&'a Decimal> for &'a Decimal {
    type Output = Decimal;

    fn mul(self, rhs: &'a Decimal) -> Decimal {
        Decimal(&self.0 * &rhs.0)
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_scale_is_power_of_ten() {
        assert_eq!(scale(0), d("1"));
        assert_eq!(scale(8), d("100000000"));
        assert_eq!(scale(18).to_canonical_string(), "1000000000000000000");
    }

    #[test]
    fn test_truncate_rounds_toward_zero() {
        assert_eq!(d("1.999999").truncate(2), d("1.99"));
        assert_eq!(d("-1.999999").truncate(2), d("-1.99"));
        assert_eq!(d("0.123456789").truncate(8), d("0.12345678"));
        assert_eq!(d("5").truncate(0), d("5"));
    }

    #[test]
    fn test_truncate_leaves_short_values_untouched() {
        let value = d("12.5");
        assert_eq!(value.truncate(18), value);
        assert_eq!(value.truncate(18).fractional_digits(), 1);
    }

    #[test]
    fn test_truncate_idempotent() {
        let samples = ["0", "1.23456789012345678901", "-0.000000001", "987654321.5", "3.14159"];
        for s in samples {
            for n in [0, 1, 6, 8, 18] {
                let once = d(s).truncate(n);
                assert_eq!(once.truncate(n), once, "sample {} digits {}", s, n);
                assert!(once.fractional_digits() <= n);
            }
        }
    }

    #[test]
    fn test_from_raw_divides_by_scale() {
        let raw = RawUint::from_str("50000000000000000000").unwrap();
        assert_eq!(Decimal::from_raw(&raw, 18), d("50"));

        let raw = RawUint::from_str("123456789").unwrap();
        assert_eq!(Decimal::from_raw(&raw, 8), d("1.23456789"));
        assert_eq!(
            Decimal::from_raw(&raw, 8),
            Decimal::new(BigDecimal::from(123456789) / scale(8).inner().clone())
        );
    }

    #[test]
    fn test_canonical_string_has_no_exponent() {
        assert_eq!(d("1000").to_canonical_string(), "1000");
        assert_eq!(d("1e30").to_canonical_string(), format!("1{}", "0".repeat(30)));
        assert_eq!(d("0.000000000000000001").to_canonical_string(), "0.000000000000000001");
        assert_eq!(d("-12.3400").to_canonical_string(), "-12.34");
        assert_eq!(Decimal::zero().to_canonical_string(), "0");
    }

    #[test]
    fn test_checked_div_by_zero() {
        assert_eq!(d("50").checked_div(&d("100")), Some(d("0.5")));
        assert_eq!(d("1").checked_div(&Decimal::zero()), None);
    }

    #[test]
    fn test_value_equality_ignores_scale() {
        assert_eq!(d("1.50"), d("1.5"));
        assert!(d("1.2") < d("1.25"));
    }

    #[test]
    fn test_decimal_json_serialization() {
        let json = serde_json::to_value(d("123.4560")).unwrap();
        assert_eq!(json, serde_json::json!("123.456"));
        let back: Decimal = serde_json::from_value(json).unwrap();
        assert_eq!(back, d("123.456"));
    }
}
