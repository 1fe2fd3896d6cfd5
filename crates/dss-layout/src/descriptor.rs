use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use dss_crypto::ContentHasher;
use dss_types::{Word, WORD_BYTES};

use crate::error::{LayoutError, LayoutResult};

/// What a declared variable holds in its slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VariableKind {
    /// A scalar, possibly packed with neighbours.
    Value,
    /// A mapping with `depth` key levels. The slot itself stays empty and
    /// only serves as the base of the derived entry slots.
    Mapping { depth: u8 },
    /// A dynamic array. The slot holds the length; elements live at
    /// `keccak(base) + index`.
    Array,
}

impl VariableKind {
    /// Mappings and arrays always take a whole slot.
    pub fn is_full_slot(&self) -> bool {
        !matches!(self, Self::Value)
    }
}

/// Where a declared variable lives: `{ name, width, slot, byte_offset }`.
///
/// `byte_offset` counts from the low-order end of the slot word.
/// Invariant: `byte_offset + width <= 32`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableDescriptor {
    pub name: String,
    pub kind: VariableKind,
    pub width: usize,
    pub slot: u64,
    pub byte_offset: usize,
}

impl VariableDescriptor {
    /// The slot index as a word.
    pub fn slot_word(&self) -> Word {
        Word::from_u64(self.slot)
    }

    /// One past the last byte occupied in the slot.
    pub fn end(&self) -> usize {
        self.byte_offset + self.width
    }

    /// Returns `true` if both variables share a slot and their byte ranges
    /// intersect.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.slot == other.slot
            && self.byte_offset < other.end()
            && other.byte_offset < self.end()
    }

    /// Same slot, offset, width and kind (the name may differ).
    pub fn same_position(&self, other: &Self) -> bool {
        self.slot == other.slot
            && self.byte_offset == other.byte_offset
            && self.width == other.width
            && self.kind == other.kind
    }
}

/// The ordered list of variables a code module expects in an owner's
/// storage.
///
/// Immutable once built. Construction validates every descriptor range and
/// rejects duplicates and overlaps.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    variables: Vec<VariableDescriptor>,
}

impl ModuleDescriptor {
    /// Build a descriptor from explicit variable placements.
    pub fn new(variables: Vec<VariableDescriptor>) -> LayoutResult<Self> {
        let mut names = BTreeSet::new();
        for var in &variables {
            if var.width == 0 || var.width > WORD_BYTES {
                return Err(LayoutError::InvalidWidth {
                    name: var.name.clone(),
                    width: var.width,
                });
            }
            if var.end() > WORD_BYTES {
                return Err(LayoutError::RangeExceedsWord {
                    name: var.name.clone(),
                    offset: var.byte_offset,
                    width: var.width,
                });
            }
            if !names.insert(var.name.as_str()) {
                return Err(LayoutError::DuplicateVariable(var.name.clone()));
            }
        }
        for (i, a) in variables.iter().enumerate() {
            for b in &variables[i + 1..] {
                if a.overlaps(b) {
                    return Err(LayoutError::Overlap {
                        first: a.name.clone(),
                        second: b.name.clone(),
                        slot: a.slot,
                    });
                }
            }
        }
        Ok(Self { variables })
    }

    /// An empty layout (a module that keeps no state of its own).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn variables(&self) -> &[VariableDescriptor] {
        &self.variables
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Look up a variable by name.
    pub fn get(&self, name: &str) -> Option<&VariableDescriptor> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Like [`Self::get`] but with an error for unknown names.
    pub fn require(&self, name: &str) -> LayoutResult<&VariableDescriptor> {
        self.get(name)
            .ok_or_else(|| LayoutError::UnknownVariable(name.to_string()))
    }

    /// Distinct slots used by declared variables, ascending.
    pub fn used_slots(&self) -> Vec<u64> {
        let set: BTreeSet<u64> = self.variables.iter().map(|v| v.slot).collect();
        set.into_iter().collect()
    }

    /// Number of slots consumed: one past the highest slot in use.
    pub fn slot_count(&self) -> u64 {
        self.variables.iter().map(|v| v.slot + 1).max().unwrap_or(0)
    }

    /// Variables sharing `slot`, ordered by offset.
    pub fn in_slot(&self, slot: u64) -> Vec<&VariableDescriptor> {
        let mut vars: Vec<&VariableDescriptor> =
            self.variables.iter().filter(|v| v.slot == slot).collect();
        vars.sort_by_key(|v| v.byte_offset);
        vars
    }

    /// Stable BLAKE3 fingerprint of the layout.
    pub fn fingerprint(&self) -> Word {
        // Serializing plain structs to JSON cannot fail.
        ContentHasher::LAYOUT
            .hash_json(&self.variables)
            .unwrap_or_default()
    }

    /// Human-readable slot map, one line per variable.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for slot in self.used_slots() {
            for var in self.in_slot(slot) {
                let kind = match var.kind {
                    VariableKind::Value => format!("{} byte(s)", var.width),
                    VariableKind::Mapping { depth } => format!("mapping/{depth}"),
                    VariableKind::Array => "array".to_string(),
                };
                let _ = writeln!(
                    out,
                    "slot {:>3}  [{:>2}..{:>2})  {:<24} {}",
                    slot,
                    var.byte_offset,
                    var.end(),
                    var.name,
                    kind
                );
            }
        }
        out
    }
}
