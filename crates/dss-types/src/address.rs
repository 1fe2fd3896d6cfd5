use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// A 20-byte identity.
///
/// Addresses name callers, admins, storage owners and code modules. When an
/// address is stored in a word it occupies the low-order 20 bytes
/// (see [`crate::WordCodec::encode_address`]).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// The zero address.
    pub const ZERO: Self = Self([0u8; 20]);

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Derive an address from a domain tag and arbitrary material.
    ///
    /// BLAKE3 over `domain ":" data`, keeping the last 20 bytes of the digest.
    /// The same inputs always produce the same address.
    pub fn derive(domain: &str, data: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        let digest = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest.as_bytes()[12..]);
        Self(bytes)
    }

    /// Create a random address for tests and demos.
    pub fn random() -> Self {
        let mut bytes = [0u8; 20];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Full `0x`-prefixed hex (42 characters).
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Short form: `0x` plus the first 8 hex characters.
    pub fn short_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0[..4]))
    }

    /// Parse from a 40-character hex string, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 20 {
            return Err(TypeError::InvalidLength {
                expected: 20,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.short_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            <[u8; 20]>::deserialize(deserializer).map(Self)
        }
    }
}
