//! Slot storage for the Delegated Slot Store.
//!
//! Every storage owner has exactly one word-array: a flat, sparse map from
//! 32-byte slot indices to 32-byte words. Reading a slot that was never
//! written yields the zero word; there is no "not found".
//!
//! # Backends
//!
//! All backends implement the [`SlotStore`] trait:
//!
//! - [`InMemorySlotStore`] -- `HashMap`-of-`BTreeMap` store behind a `RwLock`
//!
//! # Rules
//!
//! 1. Writing the zero word removes the entry, so memory is proportional to
//!    the non-zero slots only.
//! 2. Writes are permanent until overwritten. There is no eviction.
//! 3. Writes made during one dispatch go through a [`WriteOverlay`] and reach
//!    the backend in a single batch, or not at all.
//! 4. The store never interprets slot contents.

pub mod error;
pub mod memory;
pub mod overlay;
pub mod snapshot;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemorySlotStore;
pub use overlay::WriteOverlay;
pub use snapshot::{BindingRecord, OwnerSnapshot};
pub use traits::SlotStore;
