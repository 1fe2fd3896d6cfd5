//! Encoding of native values into 32-byte storage words.
//!
//! Values are big-endian and right-aligned. Packed fields are addressed by a
//! byte offset counted from the least-significant (right-most) byte of the
//! word: the first field placed in a slot sits at offset 0 in the low-order
//! bytes, the next one immediately to its left, and so on. This matches the
//! canonical slot packing convention, so raw slot reads line up with what
//! other tooling reports.

use crate::address::Address;
use crate::error::CodecError;
use crate::word::Word;

/// Width of a storage word in bytes.
pub const WORD_BYTES: usize = 32;

/// Stateless word encoder/decoder.
pub struct WordCodec;

impl WordCodec {
    /// Validate a field width.
    pub fn check_width(width: usize) -> Result<(), CodecError> {
        if width == 0 || width > WORD_BYTES {
            return Err(CodecError::InvalidWidth(width));
        }
        Ok(())
    }

    /// Validate a sub-word byte range.
    pub fn check_range(byte_offset: usize, width: usize) -> Result<(), CodecError> {
        Self::check_width(width)?;
        if byte_offset + width > WORD_BYTES {
            return Err(CodecError::InvalidRange {
                offset: byte_offset,
                width,
            });
        }
        Ok(())
    }

    /// Encode an unsigned value of the given byte width.
    ///
    /// Fails with [`CodecError::ValueTooWide`] if `value >= 2^(8 * width)`.
    pub fn encode_uint(value: impl Into<Word>, width: usize) -> Result<Word, CodecError> {
        Self::check_width(width)?;
        let value = value.into();
        if !value.fits_in(width) {
            return Err(CodecError::ValueTooWide { value, width });
        }
        Ok(value)
    }

    /// Decode the unsigned field at `[byte_offset, byte_offset + width)`.
    ///
    /// Never fails: bytes that would fall outside the word read as zero.
    pub fn decode_uint(word: &Word, byte_offset: usize, width: usize) -> Word {
        let mut out = [0u8; WORD_BYTES];
        if byte_offset >= WORD_BYTES {
            return Word::ZERO;
        }
        let width = width.min(WORD_BYTES - byte_offset);
        let end = WORD_BYTES - byte_offset;
        let start = end - width;
        out[WORD_BYTES - width..].copy_from_slice(&word.as_bytes()[start..end]);
        Word::from_bytes(out)
    }

    /// Read a packed field, rejecting ranges that do not fit in a word.
    pub fn extract(word: &Word, byte_offset: usize, width: usize) -> Result<Word, CodecError> {
        Self::check_range(byte_offset, width)?;
        Ok(Self::decode_uint(word, byte_offset, width))
    }

    /// Write `value` into the field at `[byte_offset, byte_offset + width)`,
    /// leaving every other byte of `word` untouched.
    pub fn insert(
        word: &Word,
        byte_offset: usize,
        width: usize,
        value: Word,
    ) -> Result<Word, CodecError> {
        Self::check_range(byte_offset, width)?;
        let value = Self::encode_uint(value, width)?;
        let mut bytes = word.into_bytes();
        let end = WORD_BYTES - byte_offset;
        let start = end - width;
        bytes[start..end].copy_from_slice(&value.as_bytes()[WORD_BYTES - width..]);
        Ok(Word::from_bytes(bytes))
    }

    /// Left-zero-pad an address to a full word.
    pub fn encode_address(address: &Address) -> Word {
        let mut bytes = [0u8; WORD_BYTES];
        bytes[12..].copy_from_slice(address.as_bytes());
        Word::from_bytes(bytes)
    }

    /// Take the low-order 20 bytes of a word as an address.
    pub fn decode_address(word: &Word) -> Address {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&word.as_bytes()[12..]);
        Address::from_bytes(bytes)
    }

    pub fn encode_bool(value: bool) -> Word {
        Word::from(value)
    }

    /// Any non-zero word decodes as `true`.
    pub fn decode_bool(word: &Word) -> bool {
        !word.is_zero()
    }

    /// Pad a key to 32 bytes for use as a mapping key.
    ///
    /// Shorter inputs are left-padded with zeros; longer inputs keep their
    /// low-order 32 bytes.
    pub fn pad32(bytes: &[u8]) -> Word {
        let mut out = [0u8; WORD_BYTES];
        let take = bytes.len().min(WORD_BYTES);
        out[WORD_BYTES - take..].copy_from_slice(&bytes[bytes.len() - take..]);
        Word::from_bytes(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encode_rejects_too_wide() {
        let err = WordCodec::encode_uint(256u64, 1).unwrap_err();
        assert_eq!(
            err,
            CodecError::ValueTooWide {
                value: Word::from_u64(256),
                width: 1
            }
        );
        assert!(WordCodec::encode_uint(255u64, 1).is_ok());
    }

    #[test]
    fn encode_rejects_bad_width() {
        assert_eq!(
            WordCodec::encode_uint(1u64, 0),
            Err(CodecError::InvalidWidth(0))
        );
        assert_eq!(
            WordCodec::encode_uint(1u64, 33),
            Err(CodecError::InvalidWidth(33))
        );
    }

    #[test]
    fn full_width_accepts_max() {
        assert_eq!(WordCodec::encode_uint(Word::MAX, 32), Ok(Word::MAX));
    }

    #[test]
    fn decode_zero_word_is_zero() {
        assert_eq!(WordCodec::decode_uint(&Word::ZERO, 7, 9), Word::ZERO);
        assert_eq!(WordCodec::decode_address(&Word::ZERO), Address::ZERO);
        assert!(!WordCodec::decode_bool(&Word::ZERO));
    }

    #[test]
    fn decode_out_of_range_reads_zero() {
        let word = Word::MAX;
        assert_eq!(WordCodec::decode_uint(&word, 32, 4), Word::ZERO);
        // Truncated to the 2 bytes that exist.
        assert_eq!(
            WordCodec::decode_uint(&word, 30, 8),
            Word::from_u64(0xffff)
        );
    }

    #[test]
    fn packed_fields_do_not_disturb_neighbours() {
        // uint128 a at offset 0, uint128 c at offset 16.
        let word = WordCodec::insert(&Word::ZERO, 0, 16, Word::from_u64(1)).unwrap();
        let word = WordCodec::insert(&word, 16, 16, Word::from_u64(3)).unwrap();
        assert_eq!(WordCodec::decode_uint(&word, 0, 16), Word::from_u64(1));
        assert_eq!(WordCodec::decode_uint(&word, 16, 16), Word::from_u64(3));
        // The first field lives in the low-order bytes.
        assert_eq!(word.as_bytes()[31], 1);
        assert_eq!(word.as_bytes()[15], 3);
    }

    #[test]
    fn insert_overwrites_only_its_range() {
        let word = Word::MAX;
        let word = WordCodec::insert(&word, 4, 2, Word::ZERO).unwrap();
        assert_eq!(WordCodec::decode_uint(&word, 4, 2), Word::ZERO);
        assert_eq!(WordCodec::decode_uint(&word, 0, 4), Word::from_u64(0xffff_ffff));
        assert_eq!(WordCodec::decode_uint(&word, 6, 1), Word::from_u64(0xff));
    }

    #[test]
    fn insert_rejects_value_too_wide_and_bad_range() {
        assert!(matches!(
            WordCodec::insert(&Word::ZERO, 0, 1, Word::from_u64(300)),
            Err(CodecError::ValueTooWide { .. })
        ));
        assert_eq!(
            WordCodec::insert(&Word::ZERO, 20, 20, Word::ZERO),
            Err(CodecError::InvalidRange {
                offset: 20,
                width: 20
            })
        );
    }

    #[test]
    fn address_is_left_padded() {
        let addr = Address::from_bytes([0x11; 20]);
        let word = WordCodec::encode_address(&addr);
        assert!(word.as_bytes()[..12].iter().all(|b| *b == 0));
        assert_eq!(WordCodec::decode_address(&word), addr);
    }

    #[test]
    fn decode_address_ignores_high_bytes() {
        let mut bytes = [0xee; 32];
        bytes[12..].copy_from_slice(&[0x22; 20]);
        let addr = WordCodec::decode_address(&Word::from_bytes(bytes));
        assert_eq!(addr, Address::from_bytes([0x22; 20]));
    }

    #[test]
    fn bool_encoding() {
        assert_eq!(WordCodec::encode_bool(true), Word::from_u64(1));
        assert!(WordCodec::decode_bool(&Word::from_u64(5)));
    }

    #[test]
    fn extract_checks_range() {
        let word = Word::from_u64(0xaabb);
        assert_eq!(WordCodec::extract(&word, 1, 1).unwrap(), Word::from_u64(0xaa));
        assert!(WordCodec::extract(&word, 31, 2).is_err());
    }

    #[test]
    fn pad32_left_pads() {
        let w = WordCodec::pad32(&[0xaa, 0xbb]);
        assert_eq!(w, Word::from_u64(0xaabb));
        let long = [1u8; 40];
        assert_eq!(WordCodec::pad32(&long), Word::from_bytes([1u8; 32]));
    }

    proptest! {
        #[test]
        fn uint_roundtrip(width in 1usize..=16, raw in any::<u128>()) {
            let value = if width == 16 { raw } else { raw % (1u128 << (8 * width)) };
            let word = WordCodec::encode_uint(value, width).unwrap();
            prop_assert_eq!(WordCodec::decode_uint(&word, 0, width).to_u128(), Some(value));
        }

        #[test]
        fn uint_roundtrip_full_width(width in 1usize..=32, seed in any::<[u8; 32]>()) {
            let mut bytes = seed;
            bytes[..32 - width].fill(0);
            let value = Word::from_bytes(bytes);
            let word = WordCodec::encode_uint(value, width).unwrap();
            prop_assert_eq!(WordCodec::decode_uint(&word, 0, width), value);
            prop_assert_eq!(WordCodec::extract(&word, 0, width).unwrap(), value);
        }

        #[test]
        fn insert_then_decode(offset in 0usize..32, width in 1usize..=32, seed in any::<[u8; 32]>(), raw in any::<u64>()) {
            prop_assume!(offset + width <= 32);
            let value = WordCodec::decode_uint(&Word::from_u64(raw), 0, width.min(8));
            let base = Word::from_bytes(seed);
            let packed = WordCodec::insert(&base, offset, width, value).unwrap();
            prop_assert_eq!(WordCodec::decode_uint(&packed, offset, width), value);
        }
    }
}
