//! Hash primitives for the Delegated Slot Store.
//!
//! Two unrelated hash families live here:
//!
//! - [`combine`]: the slot combine function. Keccak-256 over two 32-byte
//!   inputs, bit-exact with the canonical mapping layout. This function is
//!   part of the persisted format: once slots have been written with it, it
//!   must never change.
//! - [`ContentHasher`]: domain-separated BLAKE3 used for snapshot digests
//!   and layout fingerprints. These digests are never used as slot
//!   addresses.
//!
//! All crypto operations wrap established libraries. No custom cryptography.

pub mod combine;
pub mod hasher;

pub use combine::{combine, keccak256, CombineVersion};
pub use hasher::{ContentHasher, HasherError};
