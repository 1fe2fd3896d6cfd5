//! Sample code modules.
//!
//! These exist to exercise the router: each one is a small, self-contained
//! operation table over a planned layout. Modules meant to sit behind a
//! binding reserve slots 0 and 1 with `LayoutPlanner::with_reserved(2)`;
//! `broken_counter` deliberately does not.

pub mod balances;
pub mod broken_counter;
pub mod counter;
pub mod counter_v1;
pub mod counter_v2;
pub mod packing;
pub mod receiver;

use dss_types::{Word, WordCodec};

/// Short ASCII text as a right-aligned word (`"V1"` -> `0x..5631`).
pub fn text_word(text: &str) -> Word {
    WordCodec::pad32(text.as_bytes())
}

/// Inverse of [`text_word`]: strips the zero padding.
pub fn word_text(word: &Word) -> String {
    let bytes: Vec<u8> = word
        .as_bytes()
        .iter()
        .copied()
        .skip_while(|b| *b == 0)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}
