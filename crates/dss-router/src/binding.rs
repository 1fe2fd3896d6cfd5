//! The binding record kept inside each owner's own word-array.
//!
//! The active module id and the admin sit in ordinary slots, next to the
//! module's data. Nothing but the layout guard keeps a module from
//! declaring a variable on top of them.

use dss_store::{BindingRecord, SlotStore, StoreResult};
use dss_types::{Address, ModuleId, OwnerId, Word, WordCodec};

use crate::config::BindingLayout;

/// The two raw binding words of an owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindingWords {
    pub module: Word,
    pub admin: Word,
}

impl BindingWords {
    pub fn read(store: &dyn SlotStore, owner: &OwnerId, layout: &BindingLayout) -> StoreResult<Self> {
        Ok(Self {
            module: store.read(owner, &Word::from_u64(layout.module_slot))?,
            admin: store.read(owner, &Word::from_u64(layout.admin_slot))?,
        })
    }

    /// The module id, if the module word is a left-padded address.
    pub fn module_id(&self) -> Option<ModuleId> {
        is_address_word(&self.module).then(|| ModuleId::from_address(WordCodec::decode_address(&self.module)))
    }

    pub fn admin(&self) -> Address {
        WordCodec::decode_address(&self.admin)
    }

    /// Decoded view. The module id is taken from the low-order 20 bytes
    /// even when the high bytes are dirty.
    pub fn record(&self) -> BindingRecord {
        BindingRecord {
            active_module: ModuleId::from_address(WordCodec::decode_address(&self.module)),
            admin: self.admin(),
        }
    }
}

fn is_address_word(word: &Word) -> bool {
    word.as_bytes()[..12].iter().all(|b| *b == 0)
}

pub(crate) fn write_module(
    store: &dyn SlotStore,
    owner: &OwnerId,
    layout: &BindingLayout,
    module: &ModuleId,
) -> StoreResult<()> {
    store.write(
        owner,
        Word::from_u64(layout.module_slot),
        WordCodec::encode_address(module.as_address()),
    )
}

pub(crate) fn write_admin(
    store: &dyn SlotStore,
    owner: &OwnerId,
    layout: &BindingLayout,
    admin: &Address,
) -> StoreResult<()> {
    store.write(
        owner,
        Word::from_u64(layout.admin_slot),
        WordCodec::encode_address(admin),
    )
}
