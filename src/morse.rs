//! Morse character codec.
//!
//! Each ASCII character maps to one byte using a sentinel-bit scheme:
//! scanning from the most significant bit, the first `1` is a start marker,
//! every bit after it is one element (`0` = dit, `1` = dah) down to bit 0.
//! A code whose marker sits in bit 0 carries no elements (unmapped).
//!
//! The table is bit-exact with the stored memories and peers already in the
//! field. Lowercase letters share the uppercase codes.

use crate::symbol::Symbol;

/// Code for characters without a Morse representation.
pub const MORSE_NONE: u8 = 0x01;

const N: u8 = MORSE_NONE;

/// ASCII → sentinel-bit Morse code.
#[rustfmt::skip]
pub static MORSE_ASCII: [u8; 128] = [
    N, N, N, N,  N, N, N, N,  N, N, N, N,  N, N, N, N,
    N, N, N, N,  N, N, N, N,  N, N, N, N,  N, N, N, N,
    N, N, N, N,  N, N, N, N,  N, N, N, N,
    0x73, N, 0x55, 0x32,        // , - . /
    0x3F, 0x2F, 0x27, 0x23,     // 0 1 2 3
    0x21, 0x20, 0x30, 0x38,     // 4 5 6 7
    0x3C, 0x3E, N, N,           // 8 9 : ;
    N, 0x31, N, 0x4C,           // < = > ?
    N, 0x05, 0x18, 0x1A,        // @ A B C
    0x0C, 0x02, 0x12, 0x0E,     // D E F G
    0x10, 0x04, 0x17, 0x0D,     // H I J K
    0x14, 0x07, 0x06, 0x0F,     // L M N O
    0x16, 0x1D, 0x0A, 0x08,     // P Q R S
    0x03, 0x09, 0x11, 0x0B,     // T U V W
    0x19, 0x1B, 0x1C, N,        // X Y Z [
    N, N, N, N,                 // \ ] ^ _
    N, 0x05, 0x18, 0x1A,        // ` a b c
    0x0C, 0x02, 0x12, 0x0E,     // d e f g
    0x10, 0x04, 0x17, 0x0D,     // h i j k
    0x14, 0x07, 0x06, 0x0F,     // l m n o
    0x16, 0x1D, 0x0A, 0x08,     // p q r s
    0x03, 0x09, 0x11, 0x0B,     // t u v w
    0x19, 0x1B, 0x1C, N,        // x y z {
    N, N, N, N,                 // | } ~ DEL
];

/// Look up the raw code for a character. Non-ASCII maps to [`MORSE_NONE`].
#[inline]
pub fn code_for(c: char) -> u8 {
    if c.is_ascii() {
        MORSE_ASCII[c as usize]
    } else {
        MORSE_NONE
    }
}

/// Iterator over the elements of one character, first element first.
#[derive(Clone, Debug)]
pub struct CharSymbols {
    code: u8,
    // Bits still to emit below the marker.
    remaining: u8,
}

impl CharSymbols {
    fn from_code(code: u8) -> Self {
        let remaining = if code == 0 { 0 } else { 7 - code.leading_zeros() as u8 };
        Self { code, remaining }
    }
}

impl Iterator for CharSymbols {
    type Item = Symbol;

    fn next(&mut self) -> Option<Symbol> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        if (self.code >> self.remaining) & 1 == 1 {
            Some(Symbol::Dah)
        } else {
            Some(Symbol::Dit)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}

impl ExactSizeIterator for CharSymbols {}

/// Elements of `c`. Unmapped characters yield nothing.
pub fn encode_char(c: char) -> CharSymbols {
    CharSymbols::from_code(code_for(c))
}

/// Pack an element sequence back into a sentinel-bit code.
///
/// Returns `None` for empty input or more than seven elements.
pub fn code_from_symbols(symbols: &[Symbol]) -> Option<u8> {
    if symbols.is_empty() || symbols.len() > 7 {
        return None;
    }
    let mut code = 1u8;
    for sym in symbols {
        code = (code << 1) | matches!(sym, Symbol::Dah) as u8;
    }
    Some(code)
}

/// Find the canonical (uppercase) character for an element sequence.
pub fn decode_symbols(symbols: &[Symbol]) -> Option<char> {
    let code = code_from_symbols(symbols)?;
    // First match wins, so uppercase rows shadow lowercase duplicates.
    MORSE_ASCII
        .iter()
        .position(|&c| c == code)
        .map(|idx| idx as u8 as char)
}
