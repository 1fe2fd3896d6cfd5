use dss_layout::{Declaration, LayoutPlanner, LayoutResult, ModuleDescriptor};
use dss_router::{CodeModule, OperationResult, OwnerPhase, StorageContext};
use dss_types::Word;

use super::counter::{self, COUNT, LAST_UPDATED, OWNER, TOTAL_OPERATIONS};
use super::text_word;

pub const LABEL: &str = "counter-v2";

/// The v1 layout with `total_operations` appended in slot 5.
pub fn layout() -> LayoutResult<ModuleDescriptor> {
    LayoutPlanner::with_reserved(2)
        .declare(Declaration::uint(COUNT, 256))
        .declare(Declaration::address(OWNER))
        .declare(Declaration::uint(LAST_UPDATED, 256))
        .declare(Declaration::uint(TOTAL_OPERATIONS, 256))
        .build()
}

/// `initializeV2()`: only valid as the init call of an upgrade. Starts the
/// operation counter from zero.
fn initialize_v2(ctx: &mut StorageContext<'_>) -> OperationResult {
    ctx.ensure(ctx.phase() == OwnerPhase::Upgrading, "only during upgrade")?;
    ctx.store(TOTAL_OPERATIONS, Word::ZERO)?;
    let now = ctx.timestamp();
    ctx.store(LAST_UPDATED, now)?;
    Ok(Vec::new())
}

pub fn module() -> LayoutResult<CodeModule> {
    Ok(CodeModule::named(LABEL, layout()?)
        .operation("initialize", counter::initialize)
        .operation("initializeV2", initialize_v2)
        .operation("increment", counter::increment)
        .operation("incrementBy", counter::increment_by)
        .operation("add", counter::increment_by)
        .operation("decrement", counter::decrement)
        .operation("multiply", counter::multiply)
        .operation("reset", counter::reset)
        .operation("getCount", counter::get_count)
        .operation("getOwner", counter::get_owner)
        .operation("getLastUpdated", counter::get_last_updated)
        .operation("getTotalOperations", counter::get_total_operations)
        .operation("getStats", counter::get_stats)
        .operation("getVersion", |_| Ok(vec![text_word("V2")]))
        .receive(counter::accept)
        .fallback(counter::accept))
}
