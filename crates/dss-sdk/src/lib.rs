//! High-level SDK for the Delegated Slot Store.
//!
//! [`Workbench`] wires a router to an in-memory store and registers the
//! sample modules in [`modules`]. The [`scenarios`] replay the classic
//! storage-layout lessons (packing, mapping slots, proxy upgrades, broken
//! layouts, receive/fallback routing) end to end and return what they saw.

pub mod error;
pub mod modules;
pub mod scenarios;
pub mod workbench;

pub use error::{SdkError, SdkResult};
pub use modules::{text_word, word_text};
pub use workbench::Workbench;

// Re-export key types
pub use dss_layout::{CompatReport, Declaration, LayoutPlanner, ModuleDescriptor};
pub use dss_router::{Call, CodeModule, DelegationRouter, OwnerPhase, RouterConfig, RouterError};
pub use dss_store::OwnerSnapshot;
pub use dss_types::{Address, ModuleId, OwnerId, Word};
