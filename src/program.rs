//! Message programs: compressed recordings of keyed messages.
//!
//! # Byte encoding
//!
//! | Byte     | Meaning                                   |
//! |----------|-------------------------------------------|
//! | `0`      | dit                                       |
//! | `1`      | dah                                       |
//! | `N >= 2` | pause of `N - 2` ticks, tick = unit / 3   |
//!
//! Recorder, player and the network gap derived from playback all use this
//! one encoding. A pause is the silence beyond the inter-element gap that
//! every played symbol already carries.

use heapless::Vec;

use crate::morse;
use crate::symbol::Symbol;

/// Backing buffer size of one program.
pub const PROGRAM_BUFFER: usize = 600;

/// Usable capacity (buffer minus margin).
pub const PROGRAM_CAPACITY: usize = PROGRAM_BUFFER - 2;

/// Byte value of a zero-length pause.
pub const PAUSE_OFFSET: u8 = 2;

/// Pause resolution.
pub const TICKS_PER_UNIT: u32 = 3;

/// Extra silence after a character (2 units).
pub const CHAR_PAUSE_TICKS: u8 = 6;

/// Silence for a word space (7 units).
pub const WORD_PAUSE_TICKS: u8 = 21;

/// Largest pause a single byte can carry.
pub const MAX_PAUSE_TICKS: u8 = u8::MAX - PAUSE_OFFSET;

const DIT_BYTE: u8 = 0;
const DAH_BYTE: u8 = 1;

/// One decoded program step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgramOp {
    Symbol(Symbol),
    /// Pause length in ticks.
    Pause(u8),
}

impl ProgramOp {
    /// Encode as a program byte. Pauses saturate at [`MAX_PAUSE_TICKS`].
    pub fn to_byte(self) -> u8 {
        match self {
            ProgramOp::Symbol(Symbol::Dit) => DIT_BYTE,
            ProgramOp::Symbol(Symbol::Dah) => DAH_BYTE,
            ProgramOp::Pause(ticks) => ticks.min(MAX_PAUSE_TICKS) + PAUSE_OFFSET,
        }
    }

    pub fn from_byte(byte: u8) -> Self {
        match byte {
            DIT_BYTE => ProgramOp::Symbol(Symbol::Dit),
            DAH_BYTE => ProgramOp::Symbol(Symbol::Dah),
            n => ProgramOp::Pause(n - PAUSE_OFFSET),
        }
    }
}

/// Pause byte for `elapsed_ms` of silence at `unit_ms`.
///
/// Ticks are rounded to nearest; the byte saturates at 255.
pub fn pause_byte_for(elapsed_ms: u64, unit_ms: u16) -> u8 {
    let unit = u64::from(unit_ms.max(1));
    let ticks = (elapsed_ms * u64::from(TICKS_PER_UNIT) + unit / 2) / unit;
    let byte = ticks + u64::from(PAUSE_OFFSET);
    byte.min(u64::from(u8::MAX)) as u8
}

/// Duration of the pause encoded by `byte`. Symbol bytes have no pause.
pub fn pause_ms(byte: u8, unit_ms: u16) -> u32 {
    match ProgramOp::from_byte(byte) {
        ProgramOp::Pause(ticks) => ticks_to_ms(ticks, unit_ms),
        ProgramOp::Symbol(_) => 0,
    }
}

#[inline]
pub fn ticks_to_ms(ticks: u8, unit_ms: u16) -> u32 {
    u32::from(ticks) * u32::from(unit_ms) / TICKS_PER_UNIT
}

/// A fixed-capacity message program.
///
/// Appends saturate at [`PROGRAM_CAPACITY`]: a push into a full program is
/// refused and the existing bytes are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageProgram {
    bytes: Vec<u8, PROGRAM_BUFFER>,
}

impl MessageProgram {
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Build from raw bytes, keeping at most [`PROGRAM_CAPACITY`] of them.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut program = Self::new();
        for &b in bytes.iter().take(PROGRAM_CAPACITY) {
            program.push(b);
        }
        program
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.bytes.len() >= PROGRAM_CAPACITY
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Append one byte. Returns `false` if the program is full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.bytes.push(byte).is_ok()
    }

    pub fn push_op(&mut self, op: ProgramOp) -> bool {
        self.push(op.to_byte())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decode the program step by step.
    pub fn ops(&self) -> impl Iterator<Item = ProgramOp> + '_ {
        self.bytes.iter().map(|&b| ProgramOp::from_byte(b))
    }

    /// Compile text the way text playback keys it.
    ///
    /// Each character becomes its elements plus a character pause; a space
    /// becomes a word pause. Unmapped characters leave only the character
    /// pause. Output beyond capacity is dropped.
    pub fn from_text(text: &str) -> Self {
        let mut program = Self::new();
        for c in text.chars() {
            if c == ' ' {
                program.push_op(ProgramOp::Pause(WORD_PAUSE_TICKS));
                continue;
            }
            for sym in morse::encode_char(c) {
                program.push_op(ProgramOp::Symbol(sym));
            }
            program.push_op(ProgramOp::Pause(CHAR_PAUSE_TICKS));
        }
        program
    }
}

/// Encode a sequence of steps, truncating at capacity.
pub fn encode_program(ops: &[ProgramOp]) -> MessageProgram {
    let mut program = MessageProgram::new();
    for &op in ops {
        if !program.push_op(op) {
            break;
        }
    }
    program
}
