//! A counter that forgot to reserve the binding slots.
//!
//! Its `count` lands on slot 0 (the module word) and its `owner` on slot 1
//! (the admin word). Binding an owner to it and calling `increment` bumps
//! the module word, after which the owner resolves to nothing.

use dss_layout::{Declaration, LayoutPlanner, LayoutResult, ModuleDescriptor};
use dss_router::CodeModule;

use super::counter::{self, COUNT, LAST_UPDATED, OWNER};
use super::text_word;

pub const LABEL: &str = "broken-counter";

pub fn layout() -> LayoutResult<ModuleDescriptor> {
    LayoutPlanner::new()
        .declare(Declaration::uint(COUNT, 256))
        .declare(Declaration::address(OWNER))
        .declare(Declaration::uint(LAST_UPDATED, 256))
        .build()
}

pub fn module() -> LayoutResult<CodeModule> {
    Ok(CodeModule::named(LABEL, layout()?)
        .operation("count", counter::get_count)
        .operation("owner", counter::get_owner)
        .operation("increment", counter::increment)
        .operation("getVersion", |_| Ok(vec![text_word("BROKEN")])))
}
