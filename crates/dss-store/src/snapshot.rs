use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use dss_crypto::{CombineVersion, ContentHasher};
use dss_types::{Address, ModuleId, OwnerId, Word};

use crate::error::{StoreError, StoreResult};

/// The binding words of an owner, decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindingRecord {
    pub active_module: ModuleId,
    pub admin: Address,
}

/// Complete serializable state of one owner: its id, binding, the combine
/// function its mapping slots were derived with, and every non-zero slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerSnapshot {
    pub owner: OwnerId,
    pub binding: BindingRecord,
    #[serde(default)]
    pub combine: CombineVersion,
    pub slots: BTreeMap<Word, Word>,
}

/// On-disk form: the snapshot plus its digest.
#[derive(Serialize, Deserialize)]
struct SealedSnapshot {
    digest: Word,
    snapshot: OwnerSnapshot,
}

impl OwnerSnapshot {
    /// Domain-separated BLAKE3 digest of the compact encoding.
    pub fn digest(&self) -> StoreResult<Word> {
        Ok(ContentHasher::SNAPSHOT.hash(&self.to_bytes()?))
    }

    /// Compact binary encoding.
    pub fn to_bytes(&self) -> StoreResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> StoreResult<Self> {
        bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Pretty JSON with hex words.
    pub fn to_json(&self) -> StoreResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub fn from_json(text: &str) -> StoreResult<Self> {
        serde_json::from_str(text).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Write the snapshot and its digest to `path` as JSON.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let sealed = SealedSnapshot {
            digest: self.digest()?,
            snapshot: self.clone(),
        };
        let text = serde_json::to_string_pretty(&sealed)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Read a snapshot written by [`Self::save`], verifying its digest.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let sealed: SealedSnapshot =
            serde_json::from_str(&text).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let computed = sealed.snapshot.digest()?;
        if computed != sealed.digest {
            return Err(StoreError::DigestMismatch {
                expected: sealed.digest,
                computed,
            });
        }
        Ok(sealed.snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OwnerSnapshot {
        let admin = Address::from_bytes([1; 20]);
        let module = ModuleId::derive("counter-v1");
        let mut slots = BTreeMap::new();
        slots.insert(Word::from_u64(0), dss_types::WordCodec::encode_address(module.as_address()));
        slots.insert(Word::from_u64(1), dss_types::WordCodec::encode_address(&admin));
        slots.insert(Word::from_u64(2), Word::from_u64(5));
        OwnerSnapshot {
            owner: OwnerId::derive(&admin, 0),
            binding: BindingRecord {
                active_module: module,
                admin,
            },
            combine: CombineVersion::Keccak256V1,
            slots,
        }
    }

    #[test]
    fn json_roundtrip_keeps_hex_keys() {
        let snap = sample();
        let json = snap.to_json().unwrap();
        assert!(json.contains(&Word::from_u64(2).to_hex()));
        assert_eq!(OwnerSnapshot::from_json(&json).unwrap(), snap);
    }

    #[test]
    fn json_records_combine_version() {
        let json = sample().to_json().unwrap();
        assert!(json.contains("\"combine\": \"Keccak256V1\""));
        let without: String = json
            .lines()
            .filter(|line| !line.contains("\"combine\""))
            .collect::<Vec<_>>()
            .join("\n");
        let parsed = OwnerSnapshot::from_json(&without).unwrap();
        assert_eq!(parsed.combine, CombineVersion::Keccak256V1);

        let unknown = json.replace("Keccak256V1", "Keccak256V2");
        assert!(matches!(
            OwnerSnapshot::from_json(&unknown),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn binary_roundtrip() {
        let snap = sample();
        let bytes = snap.to_bytes().unwrap();
        assert_eq!(OwnerSnapshot::from_bytes(&bytes).unwrap(), snap);
    }

    #[test]
    fn digest_tracks_contents() {
        let snap = sample();
        let mut changed = snap.clone();
        changed.slots.insert(Word::from_u64(2), Word::from_u64(6));
        assert_eq!(snap.digest().unwrap(), sample().digest().unwrap());
        assert_ne!(snap.digest().unwrap(), changed.digest().unwrap());
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("owner.json");
        let snap = sample();
        snap.save(&path).unwrap();
        assert_eq!(OwnerSnapshot::load(&path).unwrap(), snap);
    }

    #[test]
    fn tampered_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("owner.json");
        sample().save(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let tampered = text.replacen(
            &Word::from_u64(5).to_hex(),
            &Word::from_u64(6).to_hex(),
            1,
        );
        std::fs::write(&path, tampered).unwrap();
        assert!(matches!(
            OwnerSnapshot::load(&path),
            Err(StoreError::DigestMismatch { .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            OwnerSnapshot::load(&dir.path().join("nope.json")),
            Err(StoreError::Io(_))
        ));
    }
}
