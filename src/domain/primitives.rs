//! Domain primitives: Address, TxHash, RawUint.

use bigdecimal::num_bigint::{BigInt, Sign};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrimitiveParseError {
    #[error("invalid address: {0}")]
    Address(String),
    #[error("invalid transaction hash: {0}")]
    TxHash(String),
    #[error("invalid unsigned integer: {0}")]
    Uint(String),
}

fn is_prefixed_hex(s: &str, hex_len: usize) -> bool {
    s.len() == hex_len + 2
        && (s.starts_with("0x") || s.starts_with("0X"))
        && s[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

/// 20-byte account or contract address, stored as lowercase `0x` hex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parse a `0x`-prefixed 40-digit hex address, normalizing case.
    pub fn parse(s: &str) -> Result<Self, PrimitiveParseError> {
        let trimmed = s.trim();
        if !is_prefixed_hex(trimmed, 40) {
            return Err(PrimitiveParseError::Address(s.to_string()));
        }
        Ok(Address(trimmed.to_ascii_lowercase()))
    }

    /// The zero-address sentinel.
    pub fn zero() -> Self {
        Address(format!("0x{}", "0".repeat(40)))
    }

    pub fn is_zero(&self) -> bool {
        self.0[2..].bytes().all(|b| b == b'0')
    }

    /// Get the address as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = PrimitiveParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = PrimitiveParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::parse(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 32-byte transaction hash, lowercase `0x` hex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxHash(String);

impl TxHash {
    pub fn parse(s: &str) -> Result<Self, PrimitiveParseError> {
        let trimmed = s.trim();
        if !is_prefixed_hex(trimmed, 64) {
            return Err(PrimitiveParseError::TxHash(s.to_string()));
        }
        Ok(TxHash(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TxHash {
    type Err = PrimitiveParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TxHash::parse(s)
    }
}

impl TryFrom<String> for TxHash {
    type Error = PrimitiveParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TxHash::parse(&value)
    }
}

impl From<TxHash> for String {
    fn from(value: TxHash) -> Self {
        value.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unsigned fixed-point integer exactly as emitted on chain (uint256).
///
/// Accepts decimal strings or `0x` hex; serializes as a decimal string.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RawUint(BigInt);

impl RawUint {
    pub fn zero() -> Self {
        RawUint(BigInt::from(0))
    }

    /// Build from big-endian bytes, as returned by an ABI-encoded uint256.
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        RawUint(BigInt::from_bytes_be(Sign::Plus, bytes))
    }

    pub fn as_bigint(&self) -> &BigInt {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.sign() == Sign::NoSign
    }
}

impl FromStr for RawUint {
    type Err = PrimitiveParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            if hex.is_empty() {
                Some(BigInt::from(0))
            } else {
                BigInt::parse_bytes(hex.as_bytes(), 16)
            }
        } else {
            BigInt::parse_bytes(trimmed.as_bytes(), 10)
        };

        match parsed {
            Some(value) if value.sign() != Sign::Minus => Ok(RawUint(value)),
            _ => Err(PrimitiveParseError::Uint(s.to_string())),
        }
    }
}

impl TryFrom<String> for RawUint {
    type Error = PrimitiveParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RawUint::from_str(&value)
    }
}

impl From<RawUint> for String {
    fn from(value: RawUint) -> Self {
        value.0.to_string()
    }
}

impl From<u64> for RawUint {
    fn from(value: u64) -> Self {
        RawUint(BigInt::from(value))
    }
}

impl fmt::Display for RawUint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'a> std::ops::Add<&'a RawUint> for &'a RawUint {
    type Output = RawUint;

    fn add(self, rhs: &'a RawUint) -> RawUint {
        RawUint(&self.0 + &rhs.0)
    }
}
