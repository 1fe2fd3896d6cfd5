use std::collections::BTreeMap;

use tracing::debug;

use dss_types::{OwnerId, Word};

use crate::error::StoreResult;
use crate::traits::SlotStore;

/// Buffered writes against one owner.
///
/// Reads see pending writes first and fall through to the backing store.
/// Nothing reaches the store until [`WriteOverlay::commit`]; dropping the
/// overlay or calling [`WriteOverlay::discard`] throws the writes away.
pub struct WriteOverlay<'a> {
    store: &'a dyn SlotStore,
    owner: OwnerId,
    pending: BTreeMap<Word, Word>,
    order: Vec<Word>,
}

impl<'a> WriteOverlay<'a> {
    pub fn new(store: &'a dyn SlotStore, owner: OwnerId) -> Self {
        Self {
            store,
            owner,
            pending: BTreeMap::new(),
            order: Vec::new(),
        }
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub fn read(&self, slot: &Word) -> StoreResult<Word> {
        match self.pending.get(slot) {
            Some(value) => Ok(*value),
            None => self.store.read(&self.owner, slot),
        }
    }

    pub fn write(&mut self, slot: Word, value: Word) {
        if self.pending.insert(slot, value).is_none() {
            self.order.push(slot);
        }
    }

    /// Returns `true` if any write is buffered.
    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Buffered writes in first-write order, with their final values.
    pub fn pending(&self) -> Vec<(Word, Word)> {
        self.order
            .iter()
            .filter_map(|slot| self.pending.get(slot).map(|v| (*slot, *v)))
            .collect()
    }

    /// Apply every buffered write in one batch. Returns the number of slots
    /// written.
    pub fn commit(self) -> StoreResult<usize> {
        let writes = self.pending();
        if !writes.is_empty() {
            self.store.write_batch(&self.owner, &writes)?;
        }
        debug!(owner = %self.owner, slots = writes.len(), "committed overlay");
        Ok(writes.len())
    }

    /// Drop every buffered write. Returns the number discarded.
    pub fn discard(self) -> usize {
        let dropped = self.pending.len();
        debug!(owner = %self.owner, slots = dropped, "discarded overlay");
        dropped
    }
}

impl std::fmt::Debug for WriteOverlay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteOverlay")
            .field("owner", &self.owner)
            .field("pending", &self.pending.len())
            .finish()
    }
}
