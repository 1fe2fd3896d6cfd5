//! A module that records which of its catch-all handlers ran.
//!
//! The two flags and the 4-byte selector share slot 2; the value of the
//! most recent call and the running total take slots 3 and 4.
//!
//! Fallback outranks receive: with both handlers present, a bare call
//! (no selector, no arguments) lands in fallback, even when it carries
//! value. Only [`ReceiverVariant::ReceiveOnly`] routes plain transfers into
//! receive.

use dss_layout::{Declaration, LayoutPlanner, LayoutResult, ModuleDescriptor};
use dss_router::{CodeModule, OperationError, OperationResult, StorageContext};
use dss_types::{Word, WordCodec};

pub const RECEIVE_CALLED: &str = "receive_called";
pub const FALLBACK_CALLED: &str = "fallback_called";
pub const LAST_SELECTOR: &str = "last_selector";
pub const VALUE_RECEIVED: &str = "value_received";
pub const TOTAL_RECEIVED: &str = "total_received";

/// Which catch-all handlers a receiver module carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiverVariant {
    Both,
    ReceiveOnly,
    FallbackOnly,
    Neither,
}

impl ReceiverVariant {
    pub const ALL: [ReceiverVariant; 4] = [
        Self::Both,
        Self::ReceiveOnly,
        Self::FallbackOnly,
        Self::Neither,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Both => "receiver",
            Self::ReceiveOnly => "receiver-receive-only",
            Self::FallbackOnly => "receiver-fallback-only",
            Self::Neither => "receiver-neither",
        }
    }

    pub fn has_receive(&self) -> bool {
        matches!(self, Self::Both | Self::ReceiveOnly)
    }

    pub fn has_fallback(&self) -> bool {
        matches!(self, Self::Both | Self::FallbackOnly)
    }
}

pub fn layout() -> LayoutResult<ModuleDescriptor> {
    LayoutPlanner::with_reserved(2)
        .declare(Declaration::boolean(RECEIVE_CALLED))
        .declare(Declaration::boolean(FALLBACK_CALLED))
        .declare(Declaration::uint(LAST_SELECTOR, 32))
        .declare(Declaration::uint(VALUE_RECEIVED, 256))
        .declare(Declaration::uint(TOTAL_RECEIVED, 256))
        .build()
}

fn credit(ctx: &mut StorageContext<'_>) -> Result<(), OperationError> {
    let value = ctx.value();
    let total = ctx
        .load(TOTAL_RECEIVED)?
        .checked_add(value)
        .ok_or_else(|| OperationError::revert("total overflow"))?;
    ctx.store(VALUE_RECEIVED, value)?;
    ctx.store(TOTAL_RECEIVED, total)?;
    Ok(())
}

fn on_receive(ctx: &mut StorageContext<'_>) -> OperationResult {
    ctx.store_bool(RECEIVE_CALLED, true)?;
    credit(ctx)?;
    Ok(Vec::new())
}

fn on_fallback(ctx: &mut StorageContext<'_>) -> OperationResult {
    let selector = ctx.call().selector_id();
    ctx.store_bool(FALLBACK_CALLED, true)?;
    ctx.store(LAST_SELECTOR, selector)?;
    credit(ctx)?;
    Ok(vec![selector])
}

fn reset_flags(ctx: &mut StorageContext<'_>) -> OperationResult {
    ctx.store_bool(RECEIVE_CALLED, false)?;
    ctx.store_bool(FALLBACK_CALLED, false)?;
    ctx.store(LAST_SELECTOR, Word::ZERO)?;
    Ok(Vec::new())
}

/// `(receive_called, fallback_called, last_selector, value_received,
/// total_received)`.
fn get_state(ctx: &mut StorageContext<'_>) -> OperationResult {
    Ok(vec![
        WordCodec::encode_bool(ctx.load_bool(RECEIVE_CALLED)?),
        WordCodec::encode_bool(ctx.load_bool(FALLBACK_CALLED)?),
        ctx.load(LAST_SELECTOR)?,
        ctx.load(VALUE_RECEIVED)?,
        ctx.load(TOTAL_RECEIVED)?,
    ])
}

pub fn module(variant: ReceiverVariant) -> LayoutResult<CodeModule> {
    let mut module = CodeModule::named(variant.label(), layout()?)
        .operation("resetFlags", reset_flags)
        .operation("getState", get_state)
        .operation("getValue", |ctx| Ok(vec![ctx.load(VALUE_RECEIVED)?]));
    if variant.has_receive() {
        module = module.receive(on_receive);
    }
    if variant.has_fallback() {
        module = module.fallback(on_fallback);
    }
    Ok(module)
}
