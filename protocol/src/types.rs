//! # Primitive Types
//!
//! Account addresses, token amounts, and the block environment every ledger
//! operation executes in.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Token amounts and voting power, in the smallest unit.
pub type Amount = u128;

/// Height of a block on the chain.
pub type BlockNumber = u64;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Length of an account address in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// Errors produced when parsing an address from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid address hex: {0}")]
    InvalidHex(String),

    #[error("invalid address length: expected {ADDRESS_LENGTH} bytes, got {0}")]
    InvalidLength(usize),
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account identifier.
///
/// The all-zero address doubles as "none": an account that has never
/// delegated reports [`Address::ZERO`] as its delegatee, and signature
/// recovery reports it for malformed signatures.
///
/// Displayed and serialized as lowercase `0x`-prefixed hex.
///
/// ```
/// use mgov_protocol::Address;
///
/// let addr: Address = "0x00000000000000000000000000000000000000aa".parse().unwrap();
/// assert_eq!(addr.as_bytes()[19], 0xaa);
/// assert!(!addr.is_zero());
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The zero address.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Builds an address from a slice, which must be exactly 20 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        let arr: [u8; ADDRESS_LENGTH] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Convenience constructor used heavily by tests and fixtures: an address
    /// whose last byte is `n` and every other byte is zero.
    pub const fn from_low_u64(n: u64) -> Self {
        let be = n.to_be_bytes();
        let mut bytes = [0u8; ADDRESS_LENGTH];
        let mut i = 0;
        while i < 8 {
            bytes[ADDRESS_LENGTH - 8 + i] = be[i];
            i += 1;
        }
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }

    /// `None` for the zero address, `Some(self)` otherwise.
    pub fn non_zero(self) -> Option<Address> {
        if self.is_zero() {
            None
        } else {
            Some(self)
        }
    }

    /// Lowercase hex with `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        Address::from_slice(&bytes)
    }
}

impl From<[u8; ADDRESS_LENGTH]> for Address {
    fn from(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// BlockEnv
// ---------------------------------------------------------------------------

/// The block an operation executes in: `block.number` and `block.timestamp`.
///
/// Checkpoints are stamped with `number`; signed delegations are checked
/// against `timestamp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEnv {
    pub number: BlockNumber,
    pub timestamp: Timestamp,
}

impl BlockEnv {
    pub fn new(number: BlockNumber, timestamp: Timestamp) -> Self {
        Self { number, timestamp }
    }

    /// The block that follows this one, `interval_secs` later.
    pub fn next(&self, interval_secs: u64) -> Self {
        Self {
            number: self.number + 1,
            timestamp: self.timestamp.saturating_add(interval_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Amount wire format
// ---------------------------------------------------------------------------

/// Serde adapter writing [`Amount`]s as decimal strings.
///
/// Balances routinely exceed `2^64` (twenty whole tokens already do), which
/// JSON numbers cannot carry losslessly. Deserialization accepts either a
/// string or a plain number.
///
/// ```
/// #[derive(serde::Serialize, serde::Deserialize)]
/// struct Balance {
///     #[serde(with = "mgov_protocol::types::amount_serde")]
///     value: u128,
/// }
///
/// let json = serde_json::to_string(&Balance { value: 20_000_000_000_000_000_000 }).unwrap();
/// assert_eq!(json, r#"{"value":"20000000000000000000"}"#);
/// ```
pub mod amount_serde {
    use super::Amount;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
            Repr::Number(n) => Ok(Amount::from(n)),
        }
    }
}
