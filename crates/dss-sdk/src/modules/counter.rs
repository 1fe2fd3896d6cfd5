//! Handlers shared by the counter modules.
//!
//! Every mutating handler stamps `last_updated` with the dispatch time.
//! Layouts that declare `total_operations` also get it bumped.

use dss_router::{OperationError, OperationResult, StorageContext};
use dss_types::{Address, Word, WordCodec};

pub const COUNT: &str = "count";
pub const OWNER: &str = "owner";
pub const LAST_UPDATED: &str = "last_updated";
pub const TOTAL_OPERATIONS: &str = "total_operations";

fn touch(ctx: &mut StorageContext<'_>) -> Result<(), OperationError> {
    let now = ctx.timestamp();
    ctx.store(LAST_UPDATED, now)?;
    if ctx.descriptor().get(TOTAL_OPERATIONS).is_some() {
        let ops = ctx.load(TOTAL_OPERATIONS)?.wrapping_add(Word::from_u64(1));
        ctx.store(TOTAL_OPERATIONS, ops)?;
    }
    Ok(())
}

fn set_count(ctx: &mut StorageContext<'_>, value: Word) -> OperationResult {
    ctx.store(COUNT, value)?;
    touch(ctx)?;
    Ok(vec![value])
}

fn only_owner(ctx: &StorageContext<'_>) -> Result<(), OperationError> {
    let owner = ctx.load_address(OWNER)?;
    ctx.ensure(ctx.caller() == owner, "only owner")
}

/// `initialize(owner)`: one-shot.
pub fn initialize(ctx: &mut StorageContext<'_>) -> OperationResult {
    let current = ctx.load_address(OWNER)?;
    ctx.ensure(current.is_zero(), "already initialized")?;
    let owner: Address = WordCodec::decode_address(&ctx.arg(0)?);
    ctx.ensure(!owner.is_zero(), "owner cannot be zero")?;
    ctx.store_address(OWNER, &owner)?;
    let now = ctx.timestamp();
    ctx.store(LAST_UPDATED, now)?;
    Ok(Vec::new())
}

pub fn increment(ctx: &mut StorageContext<'_>) -> OperationResult {
    let next = ctx
        .load(COUNT)?
        .checked_add(Word::from_u64(1))
        .ok_or_else(|| OperationError::revert("count overflow"))?;
    set_count(ctx, next)
}

/// `incrementBy(n)`, also exposed as `add(n)`.
pub fn increment_by(ctx: &mut StorageContext<'_>) -> OperationResult {
    let amount = ctx.arg(0)?;
    let next = ctx
        .load(COUNT)?
        .checked_add(amount)
        .ok_or_else(|| OperationError::revert("count overflow"))?;
    set_count(ctx, next)
}

pub fn decrement(ctx: &mut StorageContext<'_>) -> OperationResult {
    let next = ctx
        .load(COUNT)?
        .checked_sub(Word::from_u64(1))
        .ok_or_else(|| OperationError::revert("count cannot go below zero"))?;
    set_count(ctx, next)
}

pub fn multiply(ctx: &mut StorageContext<'_>) -> OperationResult {
    let factor = ctx.arg(0)?;
    let next = ctx
        .load(COUNT)?
        .checked_mul(factor)
        .ok_or_else(|| OperationError::revert("count overflow"))?;
    set_count(ctx, next)
}

/// `reset()`: owner only.
pub fn reset(ctx: &mut StorageContext<'_>) -> OperationResult {
    only_owner(ctx)?;
    set_count(ctx, Word::ZERO)
}

pub fn get_count(ctx: &mut StorageContext<'_>) -> OperationResult {
    Ok(vec![ctx.load(COUNT)?])
}

pub fn get_owner(ctx: &mut StorageContext<'_>) -> OperationResult {
    Ok(vec![ctx.load(OWNER)?])
}

pub fn get_last_updated(ctx: &mut StorageContext<'_>) -> OperationResult {
    Ok(vec![ctx.load(LAST_UPDATED)?])
}

pub fn get_total_operations(ctx: &mut StorageContext<'_>) -> OperationResult {
    Ok(vec![ctx.load(TOTAL_OPERATIONS)?])
}

/// `(count, total_operations, last_updated)`.
pub fn get_stats(ctx: &mut StorageContext<'_>) -> OperationResult {
    Ok(vec![
        ctx.load(COUNT)?,
        ctx.load(TOTAL_OPERATIONS)?,
        ctx.load(LAST_UPDATED)?,
    ])
}

/// Accepts value with no side effect.
pub fn accept(_ctx: &mut StorageContext<'_>) -> OperationResult {
    Ok(Vec::new())
}
