//! Hardware Abstraction Layer for the network keyer.
//!
//! Narrow traits for everything the keyer touches: contacts, the analog
//! memory selector, tone/keying outputs, a millisecond clock, a datagram
//! transport and a byte-addressable non-volatile store. Business logic stays
//! in core modules, boards are just I/O.

use crate::symbol::GpioState;

pub mod gpio;

#[cfg(any(test, feature = "std"))]
pub mod sim;

#[cfg(feature = "std")]
pub mod udp;

#[cfg(all(feature = "std", not(target_os = "espidf")))]
pub mod host;

#[cfg(all(feature = "std", target_os = "espidf"))]
pub mod esp;

/// Debounce spacing between the two contact samples.
pub const DEBOUNCE_MS: u32 = 3;

/// Digital inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Contact {
    Dit,
    Dah,
    Setup,
}

/// Contact and selector inputs.
pub trait Contacts {
    /// Contact closed (paddle pressed / button held).
    fn is_closed(&mut self, contact: Contact) -> bool;

    /// Memory selector position: 0 = none, 1..=3 = slot.
    fn selector(&mut self) -> u8;
}

/// Tone and keying outputs. Called at high rate; must not block.
pub trait Keying {
    fn start_tone(&mut self, hz: u16);
    fn stop_tone(&mut self);
    /// Rig keying line.
    fn set_key(&mut self, down: bool);
    fn set_status(&mut self, on: bool);
}

/// Monotonic millisecond clock.
pub trait Clock {
    fn now_ms(&self) -> u64;

    /// Called once per busy-wait iteration.
    fn relax(&mut self) {}
}

/// Unreliable datagram link carrying 8-byte records.
pub trait Transport {
    fn send(&mut self, datagram: &[u8; 8]) -> Result<(), TransportError>;

    /// Non-blocking poll.
    fn try_receive(&mut self) -> Option<[u8; 8]>;
}

/// Everything the keyer needs from a board.
pub trait Board: Contacts + Keying + Clock + Transport {}

impl<T: Contacts + Keying + Clock + Transport> Board for T {}

/// Byte-addressable non-volatile region.
pub trait ByteStore {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read one byte. Out of range reads return the erased value `0xFF`.
    fn read(&self, offset: usize) -> u8;

    fn write(&mut self, offset: usize, value: u8) -> Result<(), StorageError>;

    /// Make pending writes durable.
    fn commit(&mut self) -> Result<(), StorageError>;
}

/// Transport failures. Logged and counted, never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    SendFailed,
    NotConnected,
}

impl TransportError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::SendFailed => "T01",
            Self::NotConnected => "T02",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::SendFailed => "send failed",
            Self::NotConnected => "no peer",
        }
    }
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// Storage failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    CommitFailed,
    OutOfRange,
}

impl StorageError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::CommitFailed => "S01",
            Self::OutOfRange => "S02",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::CommitFailed => "commit failed",
            Self::OutOfRange => "offset out of range",
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// Map a 10-bit analog reading of the resistor-ladder selector to a position.
///
/// Readings between bands count as no selection.
pub fn selector_band(raw: u16) -> u8 {
    match raw {
        0..=99 => 0,
        401..=599 => 1,
        601..=899 => 2,
        901.. => 3,
        _ => 0,
    }
}

/// Busy-wait `ms` milliseconds.
pub fn delay_ms<B: Clock + ?Sized>(board: &mut B, ms: u32) {
    let end = board.now_ms() + u64::from(ms);
    while board.now_ms() < end {
        board.relax();
    }
}

/// Sample both paddles twice, [`DEBOUNCE_MS`] apart, and AND the results.
pub fn sample_paddles<B: Contacts + Clock + ?Sized>(board: &mut B) -> GpioState {
    let dit = board.is_closed(Contact::Dit);
    let dah = board.is_closed(Contact::Dah);
    delay_ms(board, DEBOUNCE_MS);
    let dit = dit && board.is_closed(Contact::Dit);
    let dah = dah && board.is_closed(Contact::Dah);
    GpioState::new(dit, dah)
}
