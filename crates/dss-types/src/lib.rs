//! Foundation types for the Delegated Slot Store (DSS).
//!
//! This crate provides the storage word, address and identity types used
//! throughout the DSS system, plus the [`WordCodec`] that packs native values
//! into words. Every other DSS crate depends on `dss-types`.
//!
//! # Key Types
//!
//! - [`Word`]: 32-byte big-endian unsigned integer, the atomic unit of storage
//! - [`Address`]: 20-byte identity used for callers, admins, owners and modules
//! - [`OwnerId`]: Handle of a storage owner (the entity that owns a word-array)
//! - [`ModuleId`]: Identifier of a registered code module
//! - [`WordCodec`]: Encoding of integers, addresses and booleans into words

pub mod address;
pub mod codec;
pub mod error;
pub mod identity;
pub mod word;

pub use address::Address;
pub use codec::{WordCodec, WORD_BYTES};
pub use error::{CodecError, TypeError};
pub use identity::{ModuleId, OwnerId};
pub use word::Word;
