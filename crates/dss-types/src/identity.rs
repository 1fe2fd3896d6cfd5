use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Handle of a storage owner.
///
/// An owner id is derived from the admin that created the owner and a
/// creation nonce, so two owners created by the same admin never collide.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(Address);

impl OwnerId {
    /// Derive an owner id from its creator and a nonce.
    pub fn derive(admin: &Address, nonce: u64) -> Self {
        let mut material = Vec::with_capacity(28);
        material.extend_from_slice(admin.as_bytes());
        material.extend_from_slice(&nonce.to_be_bytes());
        Self(Address::derive("dss-owner-v1", &material))
    }

    pub const fn from_address(address: Address) -> Self {
        Self(address)
    }

    pub fn as_address(&self) -> &Address {
        &self.0
    }
}

impl fmt::Debug for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnerId({})", self.0.short_hex())
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a registered code module.
///
/// The binding record stores the active module id as an address word, so a
/// module id must round-trip through [`crate::WordCodec::encode_address`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(Address);

impl ModuleId {
    /// Derive a module id from a human-readable label (e.g. `"counter-v1"`).
    pub fn derive(label: &str) -> Self {
        Self(Address::derive("dss-module-v1", label.as_bytes()))
    }

    pub const fn from_address(address: Address) -> Self {
        Self(address)
    }

    pub fn as_address(&self) -> &Address {
        &self.0
    }
}

impl fmt::Debug for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleId({})", self.0.short_hex())
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Address> for ModuleId {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl From<Address> for OwnerId {
    fn from(address: Address) -> Self {
        Self(address)
    }
}
