//! Morse character codec tests

use rust_net_cw_keyer::morse::{code_for, code_from_symbols, decode_symbols, encode_char, MORSE_NONE};
use rust_net_cw_keyer::Symbol::{self, Dah, Dit};

const MAPPED: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789,./=?";

#[test]
fn test_round_trip_all_mapped() {
    for c in MAPPED.chars() {
        let symbols: Vec<Symbol> = encode_char(c).collect();
        assert!(!symbols.is_empty(), "{} should be mapped", c);
        assert_eq!(decode_symbols(&symbols), Some(c), "round trip of {}", c);
    }
}

#[test]
fn test_lowercase_shares_codes() {
    for c in 'a'..='z' {
        assert_eq!(code_for(c), code_for(c.to_ascii_uppercase()));
    }
    // Decoding always yields the canonical uppercase form
    assert_eq!(decode_symbols(&[Dit, Dah]), Some('A'));
}

#[test]
fn test_known_patterns() {
    assert_eq!(encode_char('S').collect::<Vec<_>>(), vec![Dit, Dit, Dit]);
    assert_eq!(encode_char('O').collect::<Vec<_>>(), vec![Dah, Dah, Dah]);
    assert_eq!(encode_char('0').count(), 5);
    assert_eq!(encode_char('?').collect::<Vec<_>>(), vec![Dit, Dit, Dah, Dah, Dit, Dit]);
}

#[test]
fn test_unmapped_characters_are_silent() {
    for c in ['-', '#', '[', '\n', 'é', '€'] {
        assert_eq!(encode_char(c).count(), 0, "{:?}", c);
    }
    assert_eq!(code_for('é'), MORSE_NONE);
}

#[test]
fn test_code_from_symbols_limits() {
    assert_eq!(code_from_symbols(&[]), None);
    assert_eq!(code_from_symbols(&[Dit; 8]), None);
    assert_eq!(code_from_symbols(&[Dit]), Some(code_for('E')));
    // Valid shape, no character
    assert_eq!(decode_symbols(&[Dah; 7]), None);
}
