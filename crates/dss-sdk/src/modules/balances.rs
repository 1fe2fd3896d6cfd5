//! Mapping-heavy sample module.
//!
//! `balances` lives at slot 0 and `allowances` at slot 1, the same slots a
//! plain token would use, so derived entry slots can be checked by hand.
//! Neither base slot is ever written: entries sit at hashed slots. The
//! `holders` array is the enumeration index mappings do not provide, with
//! `holder_index` (1-based, 0 meaning absent) guarding against duplicates.

use dss_layout::{Declaration, LayoutPlanner, LayoutResult, ModuleDescriptor};
use dss_router::{CodeModule, OperationResult, StorageContext};
use dss_types::Word;

pub const LABEL: &str = "balances";

pub const BALANCES: &str = "balances";
pub const ALLOWANCES: &str = "allowances";
pub const HOLDERS: &str = "holders";
pub const NESTED_ALLOWANCES: &str = "nested_allowances";
pub const HOLDER_INDEX: &str = "holder_index";

pub fn layout() -> LayoutResult<ModuleDescriptor> {
    LayoutPlanner::new()
        .declare(Declaration::mapping(BALANCES))
        .declare(Declaration::mapping(ALLOWANCES))
        .declare(Declaration::array(HOLDERS))
        .declare(Declaration::nested_mapping(NESTED_ALLOWANCES, 2))
        .declare(Declaration::mapping(HOLDER_INDEX))
        .build()
}

/// `setBalance(account, amount)`; first-time accounts join `holders`.
fn set_balance(ctx: &mut StorageContext<'_>) -> OperationResult {
    let account = ctx.arg(0)?;
    let amount = ctx.arg(1)?;
    ctx.store_entry(BALANCES, &[account], amount)?;
    if ctx.load_entry(HOLDER_INDEX, &[account])?.is_zero() {
        let index = ctx.array_push(HOLDERS, account)?;
        ctx.store_entry(HOLDER_INDEX, &[account], index.wrapping_add(Word::from_u64(1)))?;
    }
    Ok(Vec::new())
}

/// `setAllowance(owner, spender, amount)` writes both the flat
/// per-spender entry and the nested owner/spender entry.
fn set_allowance(ctx: &mut StorageContext<'_>) -> OperationResult {
    let owner = ctx.arg(0)?;
    let spender = ctx.arg(1)?;
    let amount = ctx.arg(2)?;
    ctx.store_entry(ALLOWANCES, &[spender], amount)?;
    ctx.store_entry(NESTED_ALLOWANCES, &[owner, spender], amount)?;
    Ok(Vec::new())
}

pub fn module() -> LayoutResult<CodeModule> {
    Ok(CodeModule::named(LABEL, layout()?)
        .operation("setBalance", set_balance)
        .operation("setAllowance", set_allowance)
        .operation("balanceOf", |ctx| {
            let account = ctx.arg(0)?;
            Ok(vec![ctx.load_entry(BALANCES, &[account])?])
        })
        .operation("balanceSlot", |ctx| {
            let account = ctx.arg(0)?;
            Ok(vec![ctx.entry_slot(BALANCES, &[account])?])
        })
        .operation("allowance", |ctx| {
            let owner = ctx.arg(0)?;
            let spender = ctx.arg(1)?;
            Ok(vec![ctx.load_entry(NESTED_ALLOWANCES, &[owner, spender])?])
        })
        .operation("allowanceSlot", |ctx| {
            let spender = ctx.arg(0)?;
            Ok(vec![ctx.entry_slot(ALLOWANCES, &[spender])?])
        })
        .operation("nestedAllowanceSlot", |ctx| {
            let owner = ctx.arg(0)?;
            let spender = ctx.arg(1)?;
            Ok(vec![ctx.entry_slot(NESTED_ALLOWANCES, &[owner, spender])?])
        })
        .operation("readSlot", |ctx| {
            let slot = ctx.arg(0)?;
            Ok(vec![ctx.sload(&slot)?])
        })
        .operation("writeSlot", |ctx| {
            let slot = ctx.arg(0)?;
            let value = ctx.arg(1)?;
            ctx.sstore(slot, value);
            Ok(Vec::new())
        })
        .operation("holderCount", |ctx| Ok(vec![ctx.array_len(HOLDERS)?]))
        .operation("holderAt", |ctx| {
            let index = ctx.arg(0)?;
            Ok(vec![ctx.array_get(HOLDERS, index)?])
        }))
}
