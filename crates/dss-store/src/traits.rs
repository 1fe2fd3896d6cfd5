use std::collections::BTreeMap;

use dss_crypto::CombineVersion;
use dss_types::{OwnerId, Word};

use crate::error::StoreResult;
use crate::snapshot::{BindingRecord, OwnerSnapshot};

/// Per-owner sparse slot storage.
///
/// All implementations must satisfy these invariants:
/// - `read` of a slot never written returns [`Word::ZERO`].
/// - Writing [`Word::ZERO`] removes the entry; it is indistinguishable from
///   a slot that was never written.
/// - `write_batch` applies all of its writes or none of them.
/// - Reads and writes on an unknown owner fail with `UnknownOwner`.
pub trait SlotStore: Send + Sync {
    /// Allocate an empty word-array for `owner`.
    fn create_owner(&self, owner: OwnerId) -> StoreResult<()>;

    /// Returns `true` if `owner` has a word-array.
    fn contains_owner(&self, owner: &OwnerId) -> bool;

    /// All owners, sorted.
    fn owners(&self) -> Vec<OwnerId>;

    /// Read one slot.
    fn read(&self, owner: &OwnerId, slot: &Word) -> StoreResult<Word>;

    /// Write one slot.
    fn write(&self, owner: &OwnerId, slot: Word, value: Word) -> StoreResult<()>;

    /// Apply several writes atomically, in order.
    ///
    /// Default implementation calls `write()` for each entry. Backends that
    /// can fail part-way must override it.
    fn write_batch(&self, owner: &OwnerId, writes: &[(Word, Word)]) -> StoreResult<()> {
        writes
            .iter()
            .try_for_each(|(slot, value)| self.write(owner, *slot, *value))
    }

    /// Every non-zero slot of `owner`, ordered by slot index.
    fn written_slots(&self, owner: &OwnerId) -> StoreResult<BTreeMap<Word, Word>>;

    /// Replace the whole word-array of `owner`, creating it if needed.
    fn replace_slots(&self, owner: OwnerId, slots: BTreeMap<Word, Word>) -> StoreResult<()>;

    /// Capture the complete state of one owner.
    fn snapshot(
        &self,
        owner: &OwnerId,
        binding: BindingRecord,
        combine: CombineVersion,
    ) -> StoreResult<OwnerSnapshot> {
        Ok(OwnerSnapshot {
            owner: *owner,
            binding,
            combine,
            slots: self.written_slots(owner)?,
        })
    }

    /// Restore an owner from a snapshot, overwriting any existing state.
    fn restore(&self, snapshot: &OwnerSnapshot) -> StoreResult<()> {
        self.replace_slots(snapshot.owner, snapshot.slots.clone())
    }
}
