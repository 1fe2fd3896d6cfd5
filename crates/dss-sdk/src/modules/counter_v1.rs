use dss_layout::{Declaration, LayoutPlanner, LayoutResult, ModuleDescriptor};
use dss_router::CodeModule;

use super::counter::{self, COUNT, LAST_UPDATED, OWNER};
use super::text_word;

pub const LABEL: &str = "counter-v1";

/// Slots 0 and 1 reserved for the binding, then `count`, `owner`,
/// `last_updated` in slots 2, 3 and 4.
pub fn layout() -> LayoutResult<ModuleDescriptor> {
    LayoutPlanner::with_reserved(2)
        .declare(Declaration::uint(COUNT, 256))
        .declare(Declaration::address(OWNER))
        .declare(Declaration::uint(LAST_UPDATED, 256))
        .build()
}

pub fn module() -> LayoutResult<CodeModule> {
    Ok(CodeModule::named(LABEL, layout()?)
        .operation("initialize", counter::initialize)
        .operation("increment", counter::increment)
        .operation("incrementBy", counter::increment_by)
        .operation("decrement", counter::decrement)
        .operation("getCount", counter::get_count)
        .operation("getOwner", counter::get_owner)
        .operation("getLastUpdated", counter::get_last_updated)
        .operation("getVersion", |_| Ok(vec![text_word("V1")]))
        .receive(counter::accept)
        .fallback(counter::accept))
}
