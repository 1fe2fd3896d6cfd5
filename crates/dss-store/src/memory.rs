use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use tracing::{debug, trace};

use dss_types::{OwnerId, Word};

use crate::error::{StoreError, StoreResult};
use crate::traits::SlotStore;

/// In-memory slot store.
///
/// One `BTreeMap` per owner, all behind a single `RwLock`. Only non-zero
/// words are kept.
pub struct InMemorySlotStore {
    owners: RwLock<HashMap<OwnerId, BTreeMap<Word, Word>>>,
}

impl InMemorySlotStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            owners: RwLock::new(HashMap::new()),
        }
    }

    /// Number of owners.
    pub fn owner_count(&self) -> usize {
        self.owners.read().expect("lock poisoned").len()
    }

    /// Non-zero slots held for `owner` (zero for unknown owners).
    pub fn slot_count(&self, owner: &OwnerId) -> usize {
        self.owners
            .read()
            .expect("lock poisoned")
            .get(owner)
            .map_or(0, BTreeMap::len)
    }

    /// Non-zero slots across all owners.
    pub fn total_slots(&self) -> usize {
        self.owners
            .read()
            .expect("lock poisoned")
            .values()
            .map(BTreeMap::len)
            .sum()
    }
}

impl Default for InMemorySlotStore {
    fn default() -> Self {
        Self::new()
    }
}

fn put(slots: &mut BTreeMap<Word, Word>, slot: Word, value: Word) {
    if value.is_zero() {
        slots.remove(&slot);
    } else {
        slots.insert(slot, value);
    }
}

impl SlotStore for InMemorySlotStore {
    fn create_owner(&self, owner: OwnerId) -> StoreResult<()> {
        let mut map = self.owners.write().expect("lock poisoned");
        if map.contains_key(&owner) {
            return Err(StoreError::OwnerExists(owner));
        }
        map.insert(owner, BTreeMap::new());
        debug!(%owner, "allocated word-array");
        Ok(())
    }

    fn contains_owner(&self, owner: &OwnerId) -> bool {
        self.owners.read().expect("lock poisoned").contains_key(owner)
    }

    fn owners(&self) -> Vec<OwnerId> {
        let map = self.owners.read().expect("lock poisoned");
        let mut ids: Vec<OwnerId> = map.keys().copied().collect();
        ids.sort();
        ids
    }

    fn read(&self, owner: &OwnerId, slot: &Word) -> StoreResult<Word> {
        let map = self.owners.read().expect("lock poisoned");
        let slots = map.get(owner).ok_or(StoreError::UnknownOwner(*owner))?;
        Ok(slots.get(slot).copied().unwrap_or(Word::ZERO))
    }

    fn write(&self, owner: &OwnerId, slot: Word, value: Word) -> StoreResult<()> {
        let mut map = self.owners.write().expect("lock poisoned");
        let slots = map.get_mut(owner).ok_or(StoreError::UnknownOwner(*owner))?;
        trace!(%owner, slot = %slot.to_short_hex(), value = %value.to_short_hex(), "sstore");
        put(slots, slot, value);
        Ok(())
    }

    fn write_batch(&self, owner: &OwnerId, writes: &[(Word, Word)]) -> StoreResult<()> {
        let mut map = self.owners.write().expect("lock poisoned");
        let slots = map.get_mut(owner).ok_or(StoreError::UnknownOwner(*owner))?;
        for (slot, value) in writes {
            put(slots, *slot, *value);
        }
        debug!(%owner, writes = writes.len(), "applied write batch");
        Ok(())
    }

    fn written_slots(&self, owner: &OwnerId) -> StoreResult<BTreeMap<Word, Word>> {
        let map = self.owners.read().expect("lock poisoned");
        map.get(owner)
            .cloned()
            .ok_or(StoreError::UnknownOwner(*owner))
    }

    fn replace_slots(&self, owner: OwnerId, slots: BTreeMap<Word, Word>) -> StoreResult<()> {
        let slots: BTreeMap<Word, Word> = slots.into_iter().filter(|(_, v)| !v.is_zero()).collect();
        let mut map = self.owners.write().expect("lock poisoned");
        debug!(%owner, slots = slots.len(), "replaced word-array");
        map.insert(owner, slots);
        Ok(())
    }
}

impl std::fmt::Debug for InMemorySlotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySlotStore")
            .field("owner_count", &self.owner_count())
            .field("total_slots", &self.total_slots())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::BindingRecord;
    use dss_types::{Address, ModuleId};
    use proptest::prelude::*;

    fn owner(n: u64) -> OwnerId {
        OwnerId::derive(&Address::from_bytes([9; 20]), n)
    }

    fn store_with(owner_id: OwnerId) -> InMemorySlotStore {
        let store = InMemorySlotStore::new();
        store.create_owner(owner_id).unwrap();
        store
    }

    #[test]
    fn unwritten_slot_reads_zero() {
        let o = owner(0);
        let store = store_with(o);
        assert_eq!(store.read(&o, &Word::from_u64(7)).unwrap(), Word::ZERO);
        assert_eq!(store.read(&o, &Word::MAX).unwrap(), Word::ZERO);
    }

    #[test]
    fn write_then_read() {
        let o = owner(0);
        let store = store_with(o);
        store.write(&o, Word::from_u64(2), Word::from_u64(42)).unwrap();
        assert_eq!(store.read(&o, &Word::from_u64(2)).unwrap(), Word::from_u64(42));
    }

    #[test]
    fn zero_write_removes_entry() {
        let o = owner(0);
        let store = store_with(o);
        store.write(&o, Word::from_u64(2), Word::from_u64(42)).unwrap();
        assert_eq!(store.slot_count(&o), 1);
        store.write(&o, Word::from_u64(2), Word::ZERO).unwrap();
        assert_eq!(store.slot_count(&o), 0);
        assert_eq!(store.read(&o, &Word::from_u64(2)).unwrap(), Word::ZERO);
    }

    #[test]
    fn owners_are_isolated() {
        let (a, b) = (owner(1), owner(2));
        let store = InMemorySlotStore::new();
        store.create_owner(a).unwrap();
        store.create_owner(b).unwrap();
        store.write(&a, Word::ZERO, Word::from_u64(1)).unwrap();
        assert_eq!(store.read(&b, &Word::ZERO).unwrap(), Word::ZERO);
        assert_eq!(store.owners().len(), 2);
    }

    #[test]
    fn unknown_owner_is_an_error() {
        let store = InMemorySlotStore::new();
        assert!(matches!(
            store.read(&owner(5), &Word::ZERO),
            Err(StoreError::UnknownOwner(_))
        ));
        assert!(store.write(&owner(5), Word::ZERO, Word::from_u64(1)).is_err());
    }

    #[test]
    fn duplicate_owner_is_rejected() {
        let o = owner(0);
        let store = store_with(o);
        assert!(matches!(store.create_owner(o), Err(StoreError::OwnerExists(_))));
    }

    #[test]
    fn batch_applies_in_order() {
        let o = owner(0);
        let store = store_with(o);
        let slot = Word::from_u64(3);
        store
            .write_batch(&o, &[(slot, Word::from_u64(1)), (slot, Word::from_u64(2))])
            .unwrap();
        assert_eq!(store.read(&o, &slot).unwrap(), Word::from_u64(2));
    }

    #[test]
    fn snapshot_and_restore() {
        let o = owner(0);
        let store = store_with(o);
        store.write(&o, Word::from_u64(2), Word::from_u64(10)).unwrap();
        store.write(&o, Word::MAX, Word::from_u64(11)).unwrap();
        let binding = BindingRecord {
            active_module: ModuleId::derive("counter-v1"),
            admin: Address::from_bytes([1; 20]),
        };
        let snap = store
            .snapshot(&o, binding, dss_crypto::CombineVersion::Keccak256V1)
            .unwrap();
        assert_eq!(snap.slots.len(), 2);

        let other = InMemorySlotStore::new();
        other.restore(&snap).unwrap();
        assert_eq!(other.read(&o, &Word::MAX).unwrap(), Word::from_u64(11));
        assert_eq!(other.written_slots(&o).unwrap(), snap.slots);
    }

    #[test]
    fn replace_drops_zero_words() {
        let o = owner(0);
        let store = InMemorySlotStore::new();
        let mut slots = BTreeMap::new();
        slots.insert(Word::from_u64(1), Word::ZERO);
        slots.insert(Word::from_u64(2), Word::from_u64(9));
        store.replace_slots(o, slots).unwrap();
        assert_eq!(store.slot_count(&o), 1);
    }

    proptest! {
        #[test]
        fn memory_tracks_only_non_zero(writes in proptest::collection::vec((0u64..16, 0u64..3), 0..64)) {
            let o = owner(0);
            let store = store_with(o);
            let mut expected = BTreeMap::new();
            for (slot, value) in &writes {
                store.write(&o, Word::from_u64(*slot), Word::from_u64(*value)).unwrap();
                if *value == 0 {
                    expected.remove(slot);
                } else {
                    expected.insert(*slot, *value);
                }
            }
            prop_assert_eq!(store.slot_count(&o), expected.len());
            for slot in 0..16u64 {
                let want = expected.get(&slot).copied().unwrap_or(0);
                prop_assert_eq!(store.read(&o, &Word::from_u64(slot)).unwrap(), Word::from_u64(want));
            }
        }
    }
}
