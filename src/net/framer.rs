//! Uplink frame accumulator.

use super::packet::{Packet, MAX_FRAME_SYMBOLS};
use crate::symbol::Symbol;

/// Packs symbols into FRAME packets, at most eight per frame.
#[derive(Clone, Debug)]
pub struct Framer {
    codes: u16,
    count: u16,
    next_sequence: u16,
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framer {
    pub const fn new() -> Self {
        Self { codes: 0, count: 0, next_sequence: 1 }
    }

    /// Append a symbol. Returns `false` if the frame is already full.
    pub fn push(&mut self, symbol: Symbol) -> bool {
        if self.is_full() {
            return false;
        }
        self.codes = (self.codes << 2) | symbol.wire_code();
        self.count += 1;
        true
    }

    #[inline]
    pub fn len(&self) -> u16 {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count >= MAX_FRAME_SYMBOLS
    }

    /// Sequence the next frame will carry.
    pub fn next_sequence(&self) -> u16 {
        self.next_sequence
    }

    /// Close the pending frame. `None` when nothing is pending.
    ///
    /// Codes are left-justified; the gap saturates at `u16::MAX`.
    pub fn take(&mut self, gap_ms: u64) -> Option<Packet> {
        if self.is_empty() {
            return None;
        }
        let codes = self.codes << (16 - 2 * self.count);
        let gap = gap_ms.min(u64::from(u16::MAX)) as u16;
        let packet = Packet::frame(self.next_sequence, gap, self.count, codes);

        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.codes = 0;
        self.count = 0;
        Some(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Symbol::{Dah, Dit};

    #[test]
    fn test_left_justified() {
        let mut f = Framer::new();
        f.push(Dit);
        f.push(Dah);
        f.push(Dit);
        let p = f.take(0).unwrap();
        assert_eq!(p.symbol_count(), 3);
        assert_eq!(p.codes(), 0b0110_0100_0000_0000);
        assert!(f.is_empty());
    }

    #[test]
    fn test_eight_symbol_cap() {
        let mut f = Framer::new();
        for _ in 0..8 {
            assert!(f.push(Dah));
        }
        assert!(f.is_full());
        assert!(!f.push(Dit));
        assert_eq!(f.take(0).unwrap().codes(), 0xAAAA);
    }

    #[test]
    fn test_sequence_wraps() {
        let mut f = Framer::new();
        assert_eq!(f.next_sequence(), 1);
        f.next_sequence = u16::MAX;
        f.push(Dit);
        assert_eq!(f.take(0).unwrap().sequence(), u16::MAX);
        assert_eq!(f.next_sequence(), 0);
    }

    #[test]
    fn test_gap_saturates() {
        let mut f = Framer::new();
        f.push(Dit);
        assert_eq!(f.take(1_000_000).unwrap().gap_ms(), u16::MAX);
        assert_eq!(f.take(10), None);
    }
}
