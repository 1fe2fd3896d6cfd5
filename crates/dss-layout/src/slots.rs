//! Slot derivation for scalars, mappings, nested mappings and arrays.
//!
//! ```text
//! scalar            slot = declared slot index
//! mapping           slot = H(pad32(key) || base)
//! nested mapping    slot = H(pad32(k2)  || H(pad32(k1) || base))
//! array element     slot = keccak(base) + index   (mod 2^256)
//! ```
//!
//! `H` is the versioned combine function from `dss-crypto`. Mappings have no
//! enumeration primitive: entry slots are scattered over the 2^256 space and
//! only reachable from their keys. Callers that need iteration keep an
//! explicit key list in an array variable.

use serde::{Deserialize, Serialize};

use dss_crypto::{keccak256, CombineVersion};
use dss_types::{Address, Word, WordCodec};

use crate::descriptor::{VariableDescriptor, VariableKind};
use crate::error::{LayoutError, LayoutResult};

/// A typed mapping key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MappingKey {
    Address(Address),
    Uint(Word),
    Bool(bool),
    Bytes32(Word),
}

impl MappingKey {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Address(_) => "address",
            Self::Uint(_) => "uint",
            Self::Bool(_) => "bool",
            Self::Bytes32(_) => "bytes32",
        }
    }
}

impl From<Address> for MappingKey {
    fn from(address: Address) -> Self {
        Self::Address(address)
    }
}

/// How a mapping turns its key into the 32-byte combine input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyEncoder {
    /// Left-zero-padded 20-byte address.
    Address,
    /// Unsigned integer of `width` bytes, left-zero-padded.
    Uint { width: usize },
    /// `0` or `1`.
    Bool,
    /// Raw 32 bytes, used as-is.
    Bytes32,
}

impl KeyEncoder {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::Uint { .. } => "uint",
            Self::Bool => "bool",
            Self::Bytes32 => "bytes32",
        }
    }

    /// Encode a key, checking it matches this encoder.
    pub fn encode(&self, key: &MappingKey) -> LayoutResult<Word> {
        match (self, key) {
            (Self::Address, MappingKey::Address(a)) => Ok(WordCodec::encode_address(a)),
            (Self::Uint { width }, MappingKey::Uint(v)) => Ok(WordCodec::encode_uint(*v, *width)?),
            (Self::Bool, MappingKey::Bool(b)) => Ok(WordCodec::encode_bool(*b)),
            (Self::Bytes32, MappingKey::Bytes32(w)) => Ok(*w),
            _ => Err(LayoutError::KeyTypeMismatch {
                expected: self.type_name(),
                actual: key.type_name(),
            }),
        }
    }
}

/// A mapping rooted at `base_slot`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingDescriptor {
    pub base_slot: Word,
    pub key_encoder: KeyEncoder,
}

impl MappingDescriptor {
    pub fn new(base_slot: impl Into<Word>, key_encoder: KeyEncoder) -> Self {
        Self {
            base_slot: base_slot.into(),
            key_encoder,
        }
    }

    /// Slot of the entry for `key`.
    pub fn slot_for(&self, space: &SlotAddressSpace, key: &MappingKey) -> LayoutResult<Word> {
        let key = self.key_encoder.encode(key)?;
        Ok(space.mapping_slot(&self.base_slot, &key))
    }
}

/// A two-level mapping: `outer` selects an inner mapping, whose entries are
/// keyed with `inner_key_encoder`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedMappingDescriptor {
    pub outer: MappingDescriptor,
    pub inner_key_encoder: KeyEncoder,
}

impl NestedMappingDescriptor {
    pub fn new(outer: MappingDescriptor, inner_key_encoder: KeyEncoder) -> Self {
        Self {
            outer,
            inner_key_encoder,
        }
    }

    /// Slot of the entry for `(outer_key, inner_key)`.
    pub fn slot_for(
        &self,
        space: &SlotAddressSpace,
        outer_key: &MappingKey,
        inner_key: &MappingKey,
    ) -> LayoutResult<Word> {
        let outer = self.outer.key_encoder.encode(outer_key)?;
        let inner = self.inner_key_encoder.encode(inner_key)?;
        Ok(space.nested_mapping_slot(&self.outer.base_slot, &outer, &inner))
    }
}

/// Deterministic slot derivation under a fixed combine function version.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAddressSpace {
    version: CombineVersion,
}

impl SlotAddressSpace {
    pub fn new(version: CombineVersion) -> Self {
        Self { version }
    }

    pub fn version(&self) -> CombineVersion {
        self.version
    }

    /// Direct slot of a declared variable.
    pub fn scalar_slot(&self, descriptor: &VariableDescriptor) -> Word {
        descriptor.slot_word()
    }

    /// `combine(key, base)` where `key` is already padded to 32 bytes.
    pub fn mapping_slot(&self, base: &Word, key: &Word) -> Word {
        self.version.apply(key, base)
    }

    /// `combine(inner, combine(outer, base))`.
    pub fn nested_mapping_slot(&self, base: &Word, outer: &Word, inner: &Word) -> Word {
        let outer_slot = self.mapping_slot(base, outer);
        self.mapping_slot(&outer_slot, inner)
    }

    /// Fold any number of keys left to right, each level combining one key
    /// with the previous result. With no keys this is `base` itself.
    pub fn chained_slot(&self, base: &Word, keys: &[Word]) -> Word {
        keys.iter()
            .fold(*base, |slot, key| self.mapping_slot(&slot, key))
    }

    /// Slot of element `index` of the array whose length lives in `base`.
    pub fn array_element_slot(&self, base: &Word, index: &Word) -> Word {
        keccak256(base.as_bytes()).wrapping_add(*index)
    }

    /// Slot of an entry of a declared mapping variable.
    ///
    /// The number of keys must equal the mapping's declared depth.
    pub fn variable_entry_slot(
        &self,
        descriptor: &VariableDescriptor,
        keys: &[Word],
    ) -> LayoutResult<Word> {
        match descriptor.kind {
            VariableKind::Mapping { depth } if depth as usize == keys.len() => {
                Ok(self.chained_slot(&descriptor.slot_word(), keys))
            }
            _ => Err(LayoutError::NotAMapping {
                name: descriptor.name.clone(),
                expected: keys.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dss_crypto::combine;
    use std::collections::HashSet;

    fn space() -> SlotAddressSpace {
        SlotAddressSpace::default()
    }

    fn user(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    #[test]
    fn mapping_slot_is_combine_of_padded_key_and_base() {
        let key = WordCodec::encode_address(&user(1));
        let expected = combine(&key, &Word::from_u64(0));
        assert_eq!(space().mapping_slot(&Word::from_u64(0), &key), expected);
    }

    #[test]
    fn mapping_slot_is_deterministic() {
        let key = Word::from_u64(77);
        let base = Word::from_u64(5);
        assert_eq!(space().mapping_slot(&base, &key), space().mapping_slot(&base, &key));
    }

    #[test]
    fn base_slot_separates_mappings() {
        let key = WordCodec::encode_address(&user(1));
        assert_ne!(
            space().mapping_slot(&Word::from_u64(0), &key),
            space().mapping_slot(&Word::from_u64(1), &key)
        );
    }

    #[test]
    fn nested_slot_equals_manual_chaining() {
        let base = Word::from_u64(3);
        let k1 = WordCodec::encode_address(&user(1));
        let k2 = WordCodec::encode_address(&user(2));
        let manual = combine(&k2, &combine(&k1, &base));
        assert_eq!(space().nested_mapping_slot(&base, &k1, &k2), manual);
        assert_eq!(space().chained_slot(&base, &[k1, k2]), manual);
    }

    #[test]
    fn nested_slot_is_order_sensitive() {
        let base = Word::from_u64(3);
        let k1 = WordCodec::encode_address(&user(1));
        let k2 = WordCodec::encode_address(&user(2));
        assert_ne!(
            space().nested_mapping_slot(&base, &k1, &k2),
            space().nested_mapping_slot(&base, &k2, &k1)
        );
    }

    #[test]
    fn chained_slot_generalises_depth() {
        let base = Word::from_u64(9);
        let keys = [Word::from_u64(1), Word::from_u64(2), Word::from_u64(3)];
        let manual = combine(&keys[2], &combine(&keys[1], &combine(&keys[0], &base)));
        assert_eq!(space().chained_slot(&base, &keys), manual);
        assert_eq!(space().chained_slot(&base, &[]), base);
    }

    #[test]
    fn random_keys_never_collide() {
        let base = Word::from_u64(0);
        let mut slots = HashSet::new();
        for _ in 0..5_000 {
            let key = WordCodec::encode_address(&Address::random());
            slots.insert(space().mapping_slot(&base, &key));
        }
        assert_eq!(slots.len(), 5_000);
    }

    #[test]
    fn array_elements_are_contiguous() {
        let base = Word::from_u64(4);
        let first = space().array_element_slot(&base, &Word::ZERO);
        let second = space().array_element_slot(&base, &Word::from_u64(1));
        assert_eq!(first, keccak256(base.as_bytes()));
        assert_eq!(second, first.wrapping_add(Word::from_u64(1)));
    }

    #[test]
    fn mapping_descriptor_checks_key_type() {
        let balances = MappingDescriptor::new(0u64, KeyEncoder::Address);
        let ok = balances.slot_for(&space(), &MappingKey::Address(user(1)));
        assert!(ok.is_ok());
        let err = balances
            .slot_for(&space(), &MappingKey::Bool(true))
            .unwrap_err();
        assert_eq!(
            err,
            LayoutError::KeyTypeMismatch {
                expected: "address",
                actual: "bool"
            }
        );
    }

    #[test]
    fn uint_key_width_is_enforced() {
        let ids = MappingDescriptor::new(2u64, KeyEncoder::Uint { width: 1 });
        let err = ids
            .slot_for(&space(), &MappingKey::Uint(Word::from_u64(300)))
            .unwrap_err();
        assert!(matches!(err, LayoutError::Codec(_)));
    }

    #[test]
    fn nested_descriptor_matches_raw_derivation() {
        let allowances = NestedMappingDescriptor::new(
            MappingDescriptor::new(3u64, KeyEncoder::Address),
            KeyEncoder::Address,
        );
        let slot = allowances
            .slot_for(
                &space(),
                &MappingKey::Address(user(1)),
                &MappingKey::Address(user(2)),
            )
            .unwrap();
        let raw = space().nested_mapping_slot(
            &Word::from_u64(3),
            &WordCodec::encode_address(&user(1)),
            &WordCodec::encode_address(&user(2)),
        );
        assert_eq!(slot, raw);
    }

    #[test]
    fn variable_entry_slot_checks_depth() {
        let var = VariableDescriptor {
            name: "allowances".into(),
            kind: VariableKind::Mapping { depth: 2 },
            width: 32,
            slot: 3,
            byte_offset: 0,
        };
        let keys = [Word::from_u64(1), Word::from_u64(2)];
        assert_eq!(
            space().variable_entry_slot(&var, &keys).unwrap(),
            space().nested_mapping_slot(&Word::from_u64(3), &keys[0], &keys[1])
        );
        assert!(space().variable_entry_slot(&var, &keys[..1]).is_err());
    }

    #[test]
    fn scalar_slot_is_declared_index() {
        let var = VariableDescriptor {
            name: "count".into(),
            kind: VariableKind::Value,
            width: 32,
            slot: 2,
            byte_offset: 0,
        };
        assert_eq!(space().scalar_slot(&var), Word::from_u64(2));
    }
}
