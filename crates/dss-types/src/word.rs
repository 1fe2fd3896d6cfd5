use std::fmt;

use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// A 32-byte storage word, interpreted as a big-endian unsigned integer.
///
/// `Word` is the atomic unit of storage and also the type of slot indices.
/// All arithmetic is modulo 2^256: the `wrapping_*` methods wrap silently,
/// the `checked_*` methods report overflow with `None`.
///
/// Human-readable serializers (JSON, TOML) see a `0x`-prefixed hex string so
/// words can be used as map keys; binary serializers see the raw 32 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Word([u8; 32]);

impl Word {
    /// The all-zero word. Unset slots read as this value.
    pub const ZERO: Self = Self([0u8; 32]);

    /// 2^256 - 1.
    pub const MAX: Self = Self([0xff; 32]);

    /// Create a word from its raw big-endian bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw big-endian bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Consume into the raw big-endian bytes.
    pub fn into_bytes(self) -> [u8; 32] {
        self.0
    }

    pub fn from_u64(value: u64) -> Self {
        Self::from_u128(value as u128)
    }

    pub fn from_u128(value: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[16..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Returns the value as `u128` if it fits.
    pub fn to_u128(&self) -> Option<u128> {
        if self.0[..16].iter().any(|b| *b != 0) {
            return None;
        }
        let mut buf = [0u8; 16];
        buf.copy_from_slice(&self.0[16..]);
        Some(u128::from_be_bytes(buf))
    }

    /// Returns the value as `u64` if it fits.
    pub fn to_u64(&self) -> Option<u64> {
        self.to_u128().and_then(|v| u64::try_from(v).ok())
    }

    /// The low-order 8 bytes, ignoring anything above.
    pub fn low_u64(&self) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.0[24..]);
        u64::from_be_bytes(buf)
    }

    /// Returns `true` if every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Number of significant bytes (32 minus the leading zero bytes).
    pub fn byte_len(&self) -> usize {
        32 - self.0.iter().take_while(|b| **b == 0).count()
    }

    /// Returns `true` if the value is below 2^(8 * width).
    pub fn fits_in(&self, width: usize) -> bool {
        self.byte_len() <= width
    }

    // -----------------------------------------------------------------------
    // Modular arithmetic
    // -----------------------------------------------------------------------

    /// Numeric view of the word.
    pub fn to_u256(&self) -> U256 {
        U256::from_be_bytes(self.0)
    }

    pub fn from_u256(value: U256) -> Self {
        Self(value.to_be_bytes::<32>())
    }

    fn lift(self, rhs: Self, op: impl FnOnce(U256, U256) -> (U256, bool)) -> (Self, bool) {
        let (value, overflow) = op(self.to_u256(), rhs.to_u256());
        (Self::from_u256(value), overflow)
    }

    pub fn overflowing_add(self, rhs: Self) -> (Self, bool) {
        self.lift(rhs, U256::overflowing_add)
    }

    pub fn overflowing_sub(self, rhs: Self) -> (Self, bool) {
        self.lift(rhs, U256::overflowing_sub)
    }

    pub fn overflowing_mul(self, rhs: Self) -> (Self, bool) {
        self.lift(rhs, U256::overflowing_mul)
    }

    pub fn wrapping_add(self, rhs: Self) -> Self {
        Self::from_u256(self.to_u256().wrapping_add(rhs.to_u256()))
    }

    pub fn wrapping_sub(self, rhs: Self) -> Self {
        Self::from_u256(self.to_u256().wrapping_sub(rhs.to_u256()))
    }

    pub fn wrapping_mul(self, rhs: Self) -> Self {
        Self::from_u256(self.to_u256().wrapping_mul(rhs.to_u256()))
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.to_u256().checked_add(rhs.to_u256()).map(Self::from_u256)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.to_u256().checked_sub(rhs.to_u256()).map(Self::from_u256)
    }

    pub fn checked_mul(self, rhs: Self) -> Option<Self> {
        self.to_u256().checked_mul(rhs.to_u256()).map(Self::from_u256)
    }

    // -----------------------------------------------------------------------
    // Text forms
    // -----------------------------------------------------------------------

    /// Full `0x`-prefixed hex (66 characters).
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Shortest `0x` hex form without leading zeros (`0x0` for zero).
    pub fn to_short_hex(&self) -> String {
        let digits = hex::encode(self.0);
        let trimmed = digits.trim_start_matches('0');
        if trimmed.is_empty() {
            "0x0".to_string()
        } else {
            format!("0x{trimmed}")
        }
    }

    /// Parse a hex string, with or without `0x`. Short strings are
    /// left-padded with zeros, so `0x2` is slot 2.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.len() > 64 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: digits.len().div_ceil(2),
            });
        }
        let padded = format!("{digits:0>64}");
        let bytes = hex::decode(&padded).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Decimal representation.
    pub fn to_dec_string(&self) -> String {
        self.to_u256().to_string()
    }

    /// Parse a decimal string. Only ASCII digits are accepted.
    pub fn from_dec_str(s: &str) -> Result<Self, TypeError> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TypeError::InvalidDecimal(s.to_string()));
        }
        U256::from_str_radix(s, 10)
            .map(Self::from_u256)
            .map_err(|_| TypeError::InvalidDecimal(s.to_string()))
    }

    /// Parse either a `0x` hex string or a decimal string.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        if s.starts_with("0x") {
            Self::from_hex(s)
        } else {
            Self::from_dec_str(s)
        }
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word({})", self.to_short_hex())
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for Word {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<Word> for [u8; 32] {
    fn from(word: Word) -> Self {
        word.0
    }
}

impl From<u64> for Word {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<u128> for Word {
    fn from(value: u128) -> Self {
        Self::from_u128(value)
    }
}

impl From<bool> for Word {
    fn from(value: bool) -> Self {
        Self::from_u64(value as u64)
    }
}

impl Serialize for Word {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Word {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            <[u8; 32]>::deserialize(deserializer).map(Self)
        }
    }
}
