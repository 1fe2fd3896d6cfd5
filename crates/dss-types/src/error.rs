use thiserror::Error;

use crate::word::Word;

/// Errors produced by parsing and conversion of foundation types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid decimal string: {0}")]
    InvalidDecimal(String),
}

/// Errors produced by the word codec.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The value does not fit in the declared byte width.
    #[error("value {value} does not fit in {width} byte(s)")]
    ValueTooWide { value: Word, width: usize },

    /// Widths must lie in `1..=32`.
    #[error("invalid width {0}: must be between 1 and 32 bytes")]
    InvalidWidth(usize),

    /// A sub-word range that does not fit inside a 32-byte word.
    #[error("byte range [{offset}, {offset}+{width}) exceeds the 32-byte word")]
    InvalidRange { offset: usize, width: usize },
}
