//! Module: symbol
//!
//! Purpose: Keying elements and paddle contact snapshots. A [`Symbol`] is the
//! atomic unit every other subsystem speaks: the keyer emits it, the recorder
//! compresses it, the uplink packs it into frames.
//!
//! Safety: Safe. No unsafe blocks. Copy types only.

/// Keying element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Symbol {
    Dit,
    Dah,
}

impl Symbol {
    /// Get the opposite element.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Symbol::Dit => Symbol::Dah,
            Symbol::Dah => Symbol::Dit,
        }
    }

    /// Key-down length in units (dit = 1, dah = 3).
    #[inline]
    pub const fn units(self) -> u32 {
        match self {
            Symbol::Dit => 1,
            Symbol::Dah => 3,
        }
    }

    /// 2-bit code used inside network frames (01 = dit, 10 = dah).
    #[inline]
    pub const fn wire_code(self) -> u16 {
        match self {
            Symbol::Dit => 0b01,
            Symbol::Dah => 0b10,
        }
    }

    /// Decode a 2-bit frame code. `00` and `11` carry no symbol.
    #[inline]
    pub const fn from_wire_code(code: u16) -> Option<Self> {
        match code & 0b11 {
            0b01 => Some(Symbol::Dit),
            0b10 => Some(Symbol::Dah),
            _ => None,
        }
    }
}

/// A symbol as it leaves the keyer.
///
/// Never stored: rendered to the outputs, appended to a program, or packed
/// into a frame within the same call that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SymbolEvent {
    pub symbol: Symbol,
    /// Keying output (rig) driven, not just the sidetone.
    pub transmit: bool,
    /// Unit length in effect when the symbol was formed.
    pub unit_ms: u16,
}

impl SymbolEvent {
    /// Key-down duration in milliseconds.
    #[inline]
    pub fn duration_ms(&self) -> u32 {
        self.symbol.units() * self.unit_ms as u32
    }
}

/// Paddle contact snapshot
///
/// Bit layout:
/// - Bit 0: DIT paddle
/// - Bit 1: DAH paddle
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct GpioState(u8);

impl GpioState {
    /// DIT paddle bit mask (bit 0)
    pub const DIT: u8 = 0x01;

    /// DAH paddle bit mask (bit 1)
    pub const DAH: u8 = 0x02;

    /// No paddles pressed
    pub const IDLE: Self = Self(0);

    /// Both paddles pressed (squeeze)
    pub const BOTH: Self = Self(Self::DIT | Self::DAH);

    pub const fn new(dit: bool, dah: bool) -> Self {
        let mut bits = 0;
        if dit {
            bits |= Self::DIT;
        }
        if dah {
            bits |= Self::DAH;
        }
        Self(bits)
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & (Self::DIT | Self::DAH))
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn dit(&self) -> bool {
        (self.0 & Self::DIT) != 0
    }

    pub const fn dah(&self) -> bool {
        (self.0 & Self::DAH) != 0
    }

    pub const fn is_idle(&self) -> bool {
        self.0 == 0
    }

    pub const fn both(&self) -> bool {
        self.0 == (Self::DIT | Self::DAH)
    }

    /// Same snapshot with the dit contact masked out.
    pub const fn without_dit(&self) -> Self {
        Self(self.0 & !Self::DIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_opposite() {
        assert_eq!(Symbol::Dit.opposite(), Symbol::Dah);
        assert_eq!(Symbol::Dah.opposite(), Symbol::Dit);
    }

    #[test]
    fn test_wire_codes() {
        assert_eq!(Symbol::Dit.wire_code(), 0b01);
        assert_eq!(Symbol::Dah.wire_code(), 0b10);
        assert_eq!(Symbol::from_wire_code(0b01), Some(Symbol::Dit));
        assert_eq!(Symbol::from_wire_code(0b10), Some(Symbol::Dah));
        assert_eq!(Symbol::from_wire_code(0b00), None);
        assert_eq!(Symbol::from_wire_code(0b11), None);
    }

    #[test]
    fn test_event_duration() {
        let ev = SymbolEvent { symbol: Symbol::Dah, transmit: true, unit_ms: 60 };
        assert_eq!(ev.duration_ms(), 180);
    }

    #[test]
    fn test_gpio_state() {
        let both = GpioState::new(true, true);
        assert_eq!(both, GpioState::BOTH);
        assert!(both.both());
        assert!(!both.without_dit().dit());
        assert!(both.without_dit().dah());

        let idle = GpioState::new(false, false);
        assert!(idle.is_idle());
        assert_eq!(GpioState::from_bits(0xFF), GpioState::BOTH);
    }
}
