//! Two layouts holding the same three integers.
//!
//! Declared as `a (128), b (256), c (128)` they take three slots; moving
//! `c` next to `a` saves one.

use dss_layout::{Declaration, LayoutPlanner, LayoutResult, ModuleDescriptor};
use dss_router::CodeModule;
use dss_types::Word;

pub const UNOPTIMIZED: &str = "packing-unoptimized";
pub const OPTIMIZED: &str = "packing-optimized";

fn declarations(optimized: bool) -> Vec<Declaration> {
    let a = Declaration::uint("a", 128);
    let b = Declaration::uint("b", 256);
    let c = Declaration::uint("c", 128);
    if optimized {
        vec![a, c, b]
    } else {
        vec![a, b, c]
    }
}

pub fn layout(optimized: bool) -> LayoutResult<ModuleDescriptor> {
    declarations(optimized)
        .into_iter()
        .fold(LayoutPlanner::with_reserved(2), LayoutPlanner::declare)
        .build()
}

pub fn module(optimized: bool) -> LayoutResult<CodeModule> {
    let label = if optimized { OPTIMIZED } else { UNOPTIMIZED };
    Ok(CodeModule::named(label, layout(optimized)?)
        .operation("initialize", |ctx| {
            ctx.store("a", 1u64)?;
            ctx.store("b", 2u64)?;
            ctx.store("c", 3u64)?;
            Ok(Vec::new())
        })
        .operation("setA", |ctx| {
            let value = ctx.arg(0)?;
            ctx.store("a", value)?;
            Ok(Vec::new())
        })
        .operation("getA", |ctx| Ok(vec![ctx.load("a")?]))
        .operation("getB", |ctx| Ok(vec![ctx.load("b")?]))
        .operation("getC", |ctx| Ok(vec![ctx.load("c")?]))
        .operation("slotCount", |ctx| {
            Ok(vec![Word::from_u64(ctx.descriptor().slot_count())])
        }))
}
