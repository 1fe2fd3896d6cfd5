use dss_types::CodecError;

/// Errors from layout planning and slot derivation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// A declaration width outside `1..=32`.
    #[error("variable '{name}' has invalid width {width}: must be between 1 and 32 bytes")]
    InvalidWidth { name: String, width: usize },

    /// Two declarations share a name.
    #[error("duplicate variable '{0}'")]
    DuplicateVariable(String),

    /// A descriptor whose byte range does not fit in its slot.
    #[error("variable '{name}' range [{offset}, {offset}+{width}) exceeds the 32-byte slot")]
    RangeExceedsWord {
        name: String,
        offset: usize,
        width: usize,
    },

    /// Two descriptors in the same slot have overlapping byte ranges.
    #[error("variables '{first}' and '{second}' overlap in slot {slot}")]
    Overlap {
        first: String,
        second: String,
        slot: u64,
    },

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// The variable exists but is not a mapping of the requested depth.
    #[error("variable '{name}' is not a mapping of depth {expected}")]
    NotAMapping { name: String, expected: usize },

    /// A mapping key of the wrong type for its encoder.
    #[error("key type mismatch: expected {expected}, got {actual}")]
    KeyTypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Result alias for layout operations.
pub type LayoutResult<T> = Result<T, LayoutError>;
