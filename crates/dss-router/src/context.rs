use dss_layout::{ModuleDescriptor, SlotAddressSpace, VariableKind};
use dss_store::WriteOverlay;
use dss_types::{Address, ModuleId, OwnerId, Word, WordCodec};

use crate::call::Call;
use crate::error::OperationError;
use crate::phase::OwnerPhase;

/// Everything a handler can see and touch during one dispatch.
///
/// The context is bound to the owner, never to the module: every slot read
/// or written here belongs to `owner`'s word-array. Named accessors resolve
/// through the active module's layout; `sload`/`sstore` address raw slots.
/// Writes are buffered and only reach the store if the handler succeeds.
pub struct StorageContext<'a> {
    owner: OwnerId,
    caller: Address,
    module: ModuleId,
    phase: OwnerPhase,
    timestamp: u64,
    call: &'a Call,
    descriptor: &'a ModuleDescriptor,
    space: SlotAddressSpace,
    overlay: WriteOverlay<'a>,
}

impl<'a> StorageContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        owner: OwnerId,
        caller: Address,
        module: ModuleId,
        phase: OwnerPhase,
        timestamp: u64,
        call: &'a Call,
        descriptor: &'a ModuleDescriptor,
        space: SlotAddressSpace,
        overlay: WriteOverlay<'a>,
    ) -> Self {
        Self {
            owner,
            caller,
            module,
            phase,
            timestamp,
            call,
            descriptor,
            space,
            overlay,
        }
    }

    pub(crate) fn into_overlay(self) -> WriteOverlay<'a> {
        self.overlay
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// The original caller, unchanged by delegation.
    pub fn caller(&self) -> Address {
        self.caller
    }

    /// The module whose code is running.
    pub fn module(&self) -> ModuleId {
        self.module
    }

    pub fn phase(&self) -> OwnerPhase {
        self.phase
    }

    /// Logical time: strictly increases with every dispatch the router runs.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn call(&self) -> &Call {
        self.call
    }

    pub fn arg(&self, index: usize) -> Result<Word, OperationError> {
        self.call.arg(index)
    }

    pub fn value(&self) -> Word {
        self.call.value
    }

    pub fn descriptor(&self) -> &ModuleDescriptor {
        self.descriptor
    }

    // -- raw slots ----------------------------------------------------------

    pub fn sload(&self, slot: &Word) -> Result<Word, OperationError> {
        Ok(self.overlay.read(slot)?)
    }

    pub fn sstore(&mut self, slot: Word, value: Word) {
        self.overlay.write(slot, value);
    }

    // -- named scalars ------------------------------------------------------

    /// Read a declared scalar, unpacked from its slot.
    pub fn load(&self, name: &str) -> Result<Word, OperationError> {
        let var = self.descriptor.require(name)?;
        let word = self.sload(&self.space.scalar_slot(var))?;
        Ok(WordCodec::extract(&word, var.byte_offset, var.width)?)
    }

    /// Write a declared scalar, leaving the other fields of its slot alone.
    ///
    /// Fails with `ValueTooWide` if `value` does not fit the declared width.
    pub fn store(&mut self, name: &str, value: impl Into<Word>) -> Result<(), OperationError> {
        let var = self.descriptor.require(name)?;
        let slot = self.space.scalar_slot(var);
        let current = self.sload(&slot)?;
        let updated = WordCodec::insert(&current, var.byte_offset, var.width, value.into())?;
        self.sstore(slot, updated);
        Ok(())
    }

    pub fn load_address(&self, name: &str) -> Result<Address, OperationError> {
        Ok(WordCodec::decode_address(&self.load(name)?))
    }

    pub fn store_address(&mut self, name: &str, address: &Address) -> Result<(), OperationError> {
        self.store(name, WordCodec::encode_address(address))
    }

    pub fn load_bool(&self, name: &str) -> Result<bool, OperationError> {
        Ok(WordCodec::decode_bool(&self.load(name)?))
    }

    pub fn store_bool(&mut self, name: &str, value: bool) -> Result<(), OperationError> {
        self.store(name, WordCodec::encode_bool(value))
    }

    // -- mappings -----------------------------------------------------------

    /// Slot of the entry of mapping `name` under `keys` (one per level).
    pub fn entry_slot(&self, name: &str, keys: &[Word]) -> Result<Word, OperationError> {
        let var = self.descriptor.require(name)?;
        Ok(self.space.variable_entry_slot(var, keys)?)
    }

    pub fn load_entry(&self, name: &str, keys: &[Word]) -> Result<Word, OperationError> {
        self.sload(&self.entry_slot(name, keys)?)
    }

    pub fn store_entry(
        &mut self,
        name: &str,
        keys: &[Word],
        value: impl Into<Word>,
    ) -> Result<(), OperationError> {
        let slot = self.entry_slot(name, keys)?;
        self.sstore(slot, value.into());
        Ok(())
    }

    // -- arrays -------------------------------------------------------------

    fn array_base(&self, name: &str) -> Result<Word, OperationError> {
        let var = self.descriptor.require(name)?;
        if var.kind != VariableKind::Array {
            return Err(OperationError::revert(format!("'{name}' is not an array")));
        }
        Ok(var.slot_word())
    }

    pub fn array_len(&self, name: &str) -> Result<Word, OperationError> {
        let base = self.array_base(name)?;
        self.sload(&base)
    }

    pub fn array_get(&self, name: &str, index: Word) -> Result<Word, OperationError> {
        let base = self.array_base(name)?;
        let len = self.sload(&base)?;
        if index >= len {
            return Err(OperationError::revert(format!(
                "index {} out of bounds for '{name}'",
                index.to_dec_string()
            )));
        }
        self.sload(&self.space.array_element_slot(&base, &index))
    }

    /// Append to an array, returning the new element's index.
    pub fn array_push(&mut self, name: &str, value: impl Into<Word>) -> Result<Word, OperationError> {
        let base = self.array_base(name)?;
        let len = self.sload(&base)?;
        let slot = self.space.array_element_slot(&base, &len);
        self.sstore(slot, value.into());
        self.sstore(base, len.wrapping_add(Word::from_u64(1)));
        Ok(len)
    }

    /// Fail the call with `reason` unless `condition` holds.
    pub fn ensure(&self, condition: bool, reason: &str) -> Result<(), OperationError> {
        if condition {
            Ok(())
        } else {
            Err(OperationError::revert(reason))
        }
    }
}
