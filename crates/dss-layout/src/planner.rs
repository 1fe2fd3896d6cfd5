use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use dss_types::WORD_BYTES;

use crate::descriptor::{ModuleDescriptor, VariableDescriptor, VariableKind};
use crate::error::{LayoutError, LayoutResult};

/// A variable declaration: a name, what it holds, and its byte width.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub kind: VariableKind,
    pub width: usize,
}

impl Declaration {
    /// A scalar of `width` bytes.
    pub fn value(name: impl Into<String>, width: usize) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Value,
            width,
        }
    }

    /// An unsigned integer of `bits` bits (`uint128` is `uint("x", 128)`).
    pub fn uint(name: impl Into<String>, bits: usize) -> Self {
        Self::value(name, bits / 8)
    }

    /// A 20-byte address.
    pub fn address(name: impl Into<String>) -> Self {
        Self::value(name, 20)
    }

    /// A 1-byte boolean.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::value(name, 1)
    }

    /// A single-level mapping.
    pub fn mapping(name: impl Into<String>) -> Self {
        Self::nested_mapping(name, 1)
    }

    /// A mapping with `depth` key levels.
    pub fn nested_mapping(name: impl Into<String>, depth: u8) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Mapping { depth },
            width: WORD_BYTES,
        }
    }

    /// A dynamic array (length in the slot, elements hashed).
    pub fn array(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Array,
            width: WORD_BYTES,
        }
    }
}

/// Greedy slot packer.
///
/// Keeps a cursor `(slot, offset)` starting at `(reserved, 0)`. For every
/// declaration in order: if it does not fit in the rest of the current slot
/// the cursor moves to `(slot + 1, 0)`; the declaration is placed at the
/// cursor and the offset advances by its width.
#[derive(Clone, Debug, Default)]
pub struct LayoutPlanner {
    reserved: u64,
    declarations: Vec<Declaration>,
}

impl LayoutPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the first `slots` slots free by emitting full-width gap
    /// variables `__gap_0 .. __gap_{slots-1}` ahead of the declarations.
    ///
    /// Modules that run behind a binding reserve its slots this way.
    pub fn with_reserved(slots: u64) -> Self {
        Self {
            reserved: slots,
            declarations: Vec::new(),
        }
    }

    /// Append a declaration.
    pub fn declare(mut self, declaration: Declaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// Plan a declaration list with no reserved slots.
    pub fn plan(declarations: &[Declaration]) -> LayoutResult<ModuleDescriptor> {
        Self {
            reserved: 0,
            declarations: declarations.to_vec(),
        }
        .build()
    }

    /// Assign every declaration a `(slot, byte_offset)`.
    pub fn build(self) -> LayoutResult<ModuleDescriptor> {
        let mut variables = Vec::with_capacity(self.reserved as usize + self.declarations.len());
        let mut seen = HashSet::new();

        for i in 0..self.reserved {
            let name = format!("__gap_{i}");
            seen.insert(name.clone());
            variables.push(VariableDescriptor {
                name,
                kind: VariableKind::Value,
                width: WORD_BYTES,
                slot: i,
                byte_offset: 0,
            });
        }

        let mut slot = self.reserved;
        let mut offset = 0usize;

        for decl in self.declarations {
            if decl.width == 0 || decl.width > WORD_BYTES {
                return Err(LayoutError::InvalidWidth {
                    name: decl.name,
                    width: decl.width,
                });
            }
            if !seen.insert(decl.name.clone()) {
                return Err(LayoutError::DuplicateVariable(decl.name));
            }
            if offset + decl.width > WORD_BYTES {
                slot += 1;
                offset = 0;
            }
            variables.push(VariableDescriptor {
                name: decl.name,
                kind: decl.kind,
                width: decl.width,
                slot,
                byte_offset: offset,
            });
            offset += decl.width;
        }

        debug!(
            variables = variables.len(),
            reserved = self.reserved,
            "planned storage layout"
        );
        ModuleDescriptor::new(variables)
    }
}
