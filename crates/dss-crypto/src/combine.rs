use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use dss_types::Word;

/// Version tag of the combine function, recorded in every owner snapshot
/// and checked when one is imported.
///
/// There is exactly one version today. A new variant may be added, but an
/// owner whose slots were written under one version must keep using it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombineVersion {
    /// `keccak256(key || base)` over two 32-byte big-endian inputs.
    #[default]
    Keccak256V1,
}

impl CombineVersion {
    /// Apply this version of the combine function.
    pub fn apply(&self, key: &Word, base: &Word) -> Word {
        match self {
            Self::Keccak256V1 => combine(key, base),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Keccak256V1 => "keccak256-v1",
        }
    }
}

/// Keccak-256 of arbitrary bytes.
pub fn keccak256(data: &[u8]) -> Word {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    Word::from_bytes(digest)
}

/// The slot combine function: `keccak256(key || base)`.
///
/// `key` is the already padded mapping key; `base` is the base slot (or the
/// result of the previous level for nested mappings).
pub fn combine(key: &Word, base: &Word) -> Word {
    let mut hasher = Keccak256::new();
    hasher.update(key.as_bytes());
    hasher.update(base.as_bytes());
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    Word::from_bytes(digest)
}
