//! Storage layout for the Delegated Slot Store.
//!
//! This crate turns variable declarations into concrete slot addresses:
//!
//! - [`LayoutPlanner`] packs ordered declarations into 32-byte slots and
//!   produces a [`ModuleDescriptor`].
//! - [`SlotAddressSpace`] derives the slot of a mapping entry, a nested
//!   mapping entry, or an array element from a base slot and keys.
//! - [`check_compatibility`] compares two descriptors and reports every
//!   change that would make an upgrade reinterpret existing data.
//!
//! # Packing rule
//!
//! Declarations are placed greedily in declaration order. A variable that
//! does not fit in what is left of the current slot starts the next slot at
//! offset 0; variables are never split across slots. Reordering declarations
//! therefore changes the slot count:
//!
//! ```rust
//! use dss_layout::{Declaration, LayoutPlanner};
//!
//! let wasteful = LayoutPlanner::plan(&[
//!     Declaration::uint("a", 128),
//!     Declaration::uint("b", 256),
//!     Declaration::uint("c", 128),
//! ]).unwrap();
//! let packed = LayoutPlanner::plan(&[
//!     Declaration::uint("a", 128),
//!     Declaration::uint("c", 128),
//!     Declaration::uint("b", 256),
//! ]).unwrap();
//! assert_eq!(wasteful.slot_count(), 3);
//! assert_eq!(packed.slot_count(), 2);
//! ```

pub mod compat;
pub mod descriptor;
pub mod error;
pub mod planner;
pub mod slots;

pub use compat::{check_compatibility, CompatReport, LayoutViolation, LayoutViolationKind};
pub use descriptor::{ModuleDescriptor, VariableDescriptor, VariableKind};
pub use error::{LayoutError, LayoutResult};
pub use planner::{Declaration, LayoutPlanner};
pub use slots::{KeyEncoder, MappingDescriptor, MappingKey, NestedMappingDescriptor, SlotAddressSpace};
