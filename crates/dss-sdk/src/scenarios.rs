//! Scripted walk-throughs of the storage-layout lessons.
//!
//! Each scenario builds its own [`Workbench`] from the given router
//! configuration, drives it, and returns a serializable report of what it
//! observed. The CLI renders these reports.

use serde::{Deserialize, Serialize};
use tracing::info;

use dss_layout::{CompatReport, SlotAddressSpace, VariableDescriptor};
use dss_router::{Call, OwnerPhase, RouterConfig, RouterError};
use dss_types::{Address, ModuleId, OwnerId, Word, WordCodec};

use crate::error::{SdkError, SdkResult};
use crate::modules::receiver::{self, ReceiverVariant};
use crate::modules::{balances, broken_counter, counter_v1, counter_v2, packing, word_text};
use crate::workbench::Workbench;

/// Slots shown before and after an upgrade.
const WATCHED_SLOTS: u64 = 6;

fn admin() -> Address {
    Address::derive("scenario", b"admin")
}

fn user(n: u8) -> Address {
    Address::derive("scenario", &[n])
}

fn changed(before: &[Word], after: &[Word]) -> Vec<u64> {
    before
        .iter()
        .zip(after)
        .enumerate()
        .filter(|(_, (b, a))| b != a)
        .map(|(i, _)| i as u64)
        .collect()
}

// ---- Upgrade ----

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpgradeReport {
    pub owner: OwnerId,
    pub from: ModuleId,
    pub to: ModuleId,
    pub compat: CompatReport,
    pub slots_before: Vec<Word>,
    pub slots_after: Vec<Word>,
    /// Indices of watched slots the rebind itself changed.
    pub changed_slots: Vec<u64>,
    pub version_before: String,
    pub version_after: String,
    pub count_before: Word,
    pub count_after: Word,
    pub total_operations: Word,
}

/// Counter v1 takes some increments, is upgraded to v2 with `initializeV2`,
/// then keeps counting with the v2 operations.
pub fn upgrade(config: &RouterConfig) -> SdkResult<UpgradeReport> {
    let bench = Workbench::with_config(config.clone())?;
    let admin = admin();
    let alice = user(1);
    let owner = bench.deploy(admin, counter_v1::LABEL)?;
    bench.call(&owner, admin, "initialize", &[WordCodec::encode_address(&alice)])?;
    for _ in 0..3 {
        bench.call(&owner, alice, "increment", &[])?;
    }

    let from = bench.module_id(counter_v1::LABEL)?;
    let to = bench.module_id(counter_v2::LABEL)?;
    let compat = bench.router().compatibility(&owner, &to)?;
    let version_before = word_text(&bench.query(&owner, alice, "getVersion", &[])?);
    let count_before = bench.query(&owner, alice, "getCount", &[])?;
    let slots_before = bench.slots(&owner, WATCHED_SLOTS)?;

    bench.router().rebind(&owner, admin, to)?;
    let slots_after = bench.slots(&owner, WATCHED_SLOTS)?;
    let changed_slots = changed(&slots_before, &slots_after);

    bench.call(&owner, alice, "increment", &[])?;
    bench.call(&owner, alice, "add", &[Word::from_u64(10)])?;
    let version_after = word_text(&bench.query(&owner, alice, "getVersion", &[])?);
    let count_after = bench.query(&owner, alice, "getCount", &[])?;
    let total_operations = bench.query(&owner, alice, "getTotalOperations", &[])?;

    info!(%owner, ?changed_slots, "upgrade scenario finished");
    Ok(UpgradeReport {
        owner,
        from,
        to,
        compat,
        slots_before,
        slots_after,
        changed_slots,
        version_before,
        version_after,
        count_before,
        count_after,
        total_operations,
    })
}

// ---- Broken layout ----

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BrokenReport {
    pub owner: OwnerId,
    pub compat: CompatReport,
    /// Error the guarded rebind returned.
    pub guard_error: Option<String>,
    /// What the broken module's `count` getter returned: the module word.
    pub count_as_seen: Word,
    pub slot0_before: Word,
    pub slot0_after: Word,
    /// Error of the first call after the module word was bumped.
    pub next_call_error: Option<String>,
    pub phase: OwnerPhase,
}

/// Counter v1 is force-rebound to a module that never reserved the binding
/// slots. One `increment` later the owner no longer resolves.
pub fn broken(config: &RouterConfig) -> SdkResult<BrokenReport> {
    let bench = Workbench::with_config(config.clone())?;
    let admin = admin();
    let alice = user(1);
    let owner = bench.deploy(admin, counter_v1::LABEL)?;
    bench.call(&owner, admin, "initialize", &[WordCodec::encode_address(&alice)])?;
    bench.call(&owner, alice, "increment", &[])?;

    let target = bench.module_id(broken_counter::LABEL)?;
    let compat = bench.router().compatibility(&owner, &target)?;
    let guard_error = bench
        .upgrade(&owner, admin, broken_counter::LABEL, None)
        .err()
        .map(|err| err.to_string());

    bench.force_upgrade(&owner, admin, broken_counter::LABEL)?;
    let count_as_seen = bench.query(&owner, alice, "count", &[])?;
    let slot0_before = bench.read_slot(&owner, 0u64)?;
    bench.call(&owner, alice, "increment", &[])?;
    let slot0_after = bench.read_slot(&owner, 0u64)?;
    let next_call_error = bench
        .call(&owner, alice, "getVersion", &[])
        .err()
        .map(|err| err.to_string());
    let phase = bench.phase(&owner)?;

    info!(%owner, %phase, "broken scenario finished");
    Ok(BrokenReport {
        owner,
        compat,
        guard_error,
        count_as_seen,
        slot0_before,
        slot0_after,
        next_call_error,
        phase,
    })
}

// ---- Receive / fallback ----

/// Which handler took a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Operation,
    Receive,
    Fallback,
    Unroutable,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoutingRow {
    pub module: String,
    pub call: String,
    pub value: Word,
    pub outcome: Outcome,
    /// Selector id recorded by the fallback, if it ran.
    pub recorded_selector: Option<Word>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FallbackReport {
    pub rows: Vec<RoutingRow>,
}

fn routing_calls() -> Vec<Call> {
    vec![
        Call::bare().with_value(1_000u64),
        Call::bare(),
        Call::new("nonExistentFunction(uint256,address)"),
        Call::new("someFakeFunction()").with_value(300u64),
        Call::bare().with_arg(1u64),
        Call::new("getValue"),
    ]
}

/// Every call shape against every receiver variant.
///
/// The `receiver` row for a bare call reports [`Outcome::Fallback`]: an
/// exact operation wins, then fallback, and receive only takes a bare call
/// when the module has no fallback.
pub fn fallback(config: &RouterConfig) -> SdkResult<FallbackReport> {
    let bench = Workbench::with_config(config.clone())?;
    let admin = admin();
    let mut rows = Vec::new();

    for variant in ReceiverVariant::ALL {
        let owner = bench.deploy(admin, variant.label())?;
        for call in routing_calls() {
            bench.call(&owner, admin, "resetFlags", &[])?;
            let result = bench.send(&owner, admin, &call);
            let state = bench.call(&owner, admin, "getState", &[])?;
            let outcome = match result {
                Err(SdkError::Router(RouterError::UnroutableCall { .. })) => Outcome::Unroutable,
                Err(err) => return Err(err),
                Ok(_) if WordCodec::decode_bool(&state[0]) => Outcome::Receive,
                Ok(_) if WordCodec::decode_bool(&state[1]) => Outcome::Fallback,
                Ok(_) => Outcome::Operation,
            };
            rows.push(RoutingRow {
                module: variant.label().to_string(),
                call: call.to_string(),
                value: call.value,
                outcome,
                recorded_selector: (outcome == Outcome::Fallback).then(|| state[2]),
            });
        }
    }
    Ok(FallbackReport { rows })
}

// ---- Packing ----

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PackedLayout {
    pub label: String,
    pub slot_count: u64,
    pub variables: Vec<VariableDescriptor>,
    /// Raw words of the owner after `initialize`.
    pub slots: Vec<Word>,
    /// `(a, b, c)` read back through the getters.
    pub values: [Word; 3],
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PackingReport {
    pub layouts: Vec<PackedLayout>,
    pub saved_slots: u64,
}

pub fn packing(config: &RouterConfig) -> SdkResult<PackingReport> {
    let bench = Workbench::with_config(config.clone())?;
    let admin = admin();
    let mut layouts = Vec::new();

    for label in [packing::UNOPTIMIZED, packing::OPTIMIZED] {
        let descriptor = bench.descriptor(label)?;
        let owner = bench.deploy(admin, label)?;
        bench.call(&owner, admin, "initialize", &[])?;
        let values = [
            bench.query(&owner, admin, "getA", &[])?,
            bench.query(&owner, admin, "getB", &[])?,
            bench.query(&owner, admin, "getC", &[])?,
        ];
        layouts.push(PackedLayout {
            label: label.to_string(),
            slot_count: descriptor.slot_count(),
            variables: descriptor.variables().to_vec(),
            slots: bench.slots(&owner, descriptor.slot_count())?,
            values,
        });
    }
    let saved_slots = layouts[0].slot_count.saturating_sub(layouts[1].slot_count);
    Ok(PackingReport {
        layouts,
        saved_slots,
    })
}

// ---- Mapping slots ----

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MappingEntry {
    pub variable: String,
    pub keys: Vec<Word>,
    /// Slot derived locally from the base slot and keys.
    pub computed_slot: Word,
    /// Slot the module reported for the same entry.
    pub reported_slot: Word,
    /// Raw word read at the computed slot.
    pub stored: Word,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MappingReport {
    pub owner: OwnerId,
    pub entries: Vec<MappingEntry>,
    /// Balance read back after writing straight into the entry slot.
    pub direct_write_balance: Word,
    pub holder_count: Word,
}

pub fn mapping(config: &RouterConfig) -> SdkResult<MappingReport> {
    let bench = Workbench::with_config(config.clone())?;
    let admin = admin();
    let space = SlotAddressSpace::default();
    let owner = bench.deploy(admin, balances::LABEL)?;
    let descriptor = bench.descriptor(balances::LABEL)?;
    let base = |name: &str| -> SdkResult<Word> { Ok(descriptor.require(name)?.slot_word()) };

    let alice = WordCodec::encode_address(&user(1));
    let bob = WordCodec::encode_address(&user(2));
    let mut entries = Vec::new();

    for (account, amount) in [(alice, 12_345u64), (bob, 22_222u64)] {
        bench.call(&owner, admin, "setBalance", &[account, Word::from_u64(amount)])?;
        let computed = space.mapping_slot(&base(balances::BALANCES)?, &account);
        entries.push(MappingEntry {
            variable: balances::BALANCES.to_string(),
            keys: vec![account],
            computed_slot: computed,
            reported_slot: bench.query(&owner, admin, "balanceSlot", &[account])?,
            stored: bench.read_slot(&owner, computed)?,
        });
    }

    bench.call(&owner, admin, "setAllowance", &[alice, bob, Word::from_u64(99_999)])?;
    let flat = space.mapping_slot(&base(balances::ALLOWANCES)?, &bob);
    entries.push(MappingEntry {
        variable: balances::ALLOWANCES.to_string(),
        keys: vec![bob],
        computed_slot: flat,
        reported_slot: bench.query(&owner, admin, "allowanceSlot", &[bob])?,
        stored: bench.read_slot(&owner, flat)?,
    });
    let nested = space.nested_mapping_slot(&base(balances::NESTED_ALLOWANCES)?, &alice, &bob);
    entries.push(MappingEntry {
        variable: balances::NESTED_ALLOWANCES.to_string(),
        keys: vec![alice, bob],
        computed_slot: nested,
        reported_slot: bench.query(&owner, admin, "nestedAllowanceSlot", &[alice, bob])?,
        stored: bench.read_slot(&owner, nested)?,
    });

    let alice_slot = entries[0].computed_slot;
    bench.call(&owner, admin, "writeSlot", &[alice_slot, Word::from_u64(777)])?;
    let direct_write_balance = bench.query(&owner, admin, "balanceOf", &[alice])?;
    let holder_count = bench.query(&owner, admin, "holderCount", &[])?;

    Ok(MappingReport {
        owner,
        entries,
        direct_write_balance,
        holder_count,
    })
}

/// The receiver variant registered under `label`, if any.
pub fn receiver_variant(label: &str) -> Option<ReceiverVariant> {
    ReceiverVariant::ALL
        .into_iter()
        .find(|variant| variant.label() == label)
}

/// Layout of the receiver module, for display.
pub fn receiver_layout() -> SdkResult<Vec<VariableDescriptor>> {
    Ok(receiver::layout()?.variables().to_vec())
}
