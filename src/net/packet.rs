//! Relay datagram format.
//!
//! Every datagram is 8 bytes: two `u32` words, big-endian on the wire.
//!
//! ```text
//! number: [31..16] gap ms      [15..0] sequence      (FRAME)
//!         0                                          (control)
//! data:   [31..30] kind
//!         FRAME:     [29..16] symbol count (<= 8)  [15..0] 2-bit codes, left-justified
//!         KEEPALIVE: [15..0] sender unit ms
//!         ACK:       unused
//! ```

use crate::symbol::Symbol;

/// Datagram size.
pub const PACKET_LEN: usize = 8;

/// Most symbols one frame carries.
pub const MAX_FRAME_SYMBOLS: u16 = 8;

const KIND_SHIFT: u32 = 30;
const COUNT_SHIFT: u32 = 16;
const COUNT_MASK: u32 = 0x3FFF;

/// Packet kind, top two bits of `data`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketKind {
    Frame = 0,
    KeepAlive = 2,
    Ack = 3,
}

/// Rejected datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    /// Kind bits 01.
    InvalidKind,
    /// Frame claims more than eight symbols.
    SymbolCount,
}

impl PacketError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidKind => "P01",
            Self::SymbolCount => "P02",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidKind => "invalid packet kind",
            Self::SymbolCount => "symbol count out of range",
        }
    }
}

impl core::fmt::Display for PacketError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// One relay datagram.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Packet {
    pub number: u32,
    pub data: u32,
}

impl Packet {
    /// FRAME with `count` codes already left-justified in `codes`.
    pub fn frame(sequence: u16, gap_ms: u16, count: u16, codes: u16) -> Self {
        Self {
            number: (u32::from(gap_ms) << 16) | u32::from(sequence),
            data: ((PacketKind::Frame as u32) << KIND_SHIFT)
                | ((u32::from(count) & COUNT_MASK) << COUNT_SHIFT)
                | u32::from(codes),
        }
    }

    pub fn keepalive(unit_ms: u16) -> Self {
        Self {
            number: 0,
            data: ((PacketKind::KeepAlive as u32) << KIND_SHIFT) | u32::from(unit_ms),
        }
    }

    pub fn ack() -> Self {
        Self { number: 0, data: (PacketKind::Ack as u32) << KIND_SHIFT }
    }

    pub fn kind(&self) -> Result<PacketKind, PacketError> {
        match self.data >> KIND_SHIFT {
            0 => Ok(PacketKind::Frame),
            2 => Ok(PacketKind::KeepAlive),
            3 => Ok(PacketKind::Ack),
            _ => Err(PacketError::InvalidKind),
        }
    }

    #[inline]
    pub fn sequence(&self) -> u16 {
        self.number as u16
    }

    #[inline]
    pub fn gap_ms(&self) -> u16 {
        (self.number >> 16) as u16
    }

    #[inline]
    pub fn symbol_count(&self) -> u16 {
        ((self.data >> COUNT_SHIFT) & COUNT_MASK) as u16
    }

    #[inline]
    pub fn codes(&self) -> u16 {
        self.data as u16
    }

    /// KEEPALIVE payload.
    #[inline]
    pub fn unit_ms(&self) -> u16 {
        self.data as u16
    }

    /// Frame symbols, most significant code first. Codes `00` and `11`
    /// carry nothing and are skipped.
    pub fn symbols(&self) -> impl Iterator<Item = Symbol> {
        let codes = self.codes();
        let count = self.symbol_count().min(MAX_FRAME_SYMBOLS);
        (0..count).filter_map(move |i| Symbol::from_wire_code(codes >> (14 - 2 * i)))
    }

    pub fn to_bytes(&self) -> [u8; PACKET_LEN] {
        let mut out = [0u8; PACKET_LEN];
        out[..4].copy_from_slice(&self.number.to_be_bytes());
        out[4..].copy_from_slice(&self.data.to_be_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; PACKET_LEN]) -> Self {
        Self {
            number: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            data: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    /// Parse and validate a received datagram.
    pub fn decode(bytes: &[u8; PACKET_LEN]) -> Result<Self, PacketError> {
        let packet = Self::from_bytes(bytes);
        if packet.kind()? == PacketKind::Frame && packet.symbol_count() > MAX_FRAME_SYMBOLS {
            return Err(PacketError::SymbolCount);
        }
        Ok(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_fields() {
        let p = Packet::frame(7, 300, 3, 0b01_10_01 << 10);
        assert_eq!(p.kind(), Ok(PacketKind::Frame));
        assert_eq!(p.sequence(), 7);
        assert_eq!(p.gap_ms(), 300);
        assert_eq!(p.symbol_count(), 3);
        assert_eq!(p.codes(), 0x6400);
        let syms: Vec<_> = p.symbols().collect();
        assert_eq!(syms, vec![Symbol::Dit, Symbol::Dah, Symbol::Dit]);
    }

    #[test]
    fn test_big_endian_layout() {
        let p = Packet::keepalive(60);
        assert_eq!(p.to_bytes(), [0, 0, 0, 0, 0x80, 0, 0, 60]);

        let p = Packet::frame(0x0102, 0x0304, 1, 0x4000);
        assert_eq!(p.to_bytes(), [0x03, 0x04, 0x01, 0x02, 0x00, 0x01, 0x40, 0x00]);
    }

    #[test]
    fn test_ack() {
        let p = Packet::decode(&Packet::ack().to_bytes()).unwrap();
        assert_eq!(p.kind(), Ok(PacketKind::Ack));
        assert_eq!(p.number, 0);
    }

    #[test]
    fn test_rejects_kind_one() {
        let bytes = [0, 0, 0, 0, 0x40, 0, 0, 0];
        assert_eq!(Packet::decode(&bytes), Err(PacketError::InvalidKind));
    }

    #[test]
    fn test_rejects_oversized_frame() {
        let bytes = [0, 0, 0, 1, 0x00, 0x09, 0, 0];
        assert_eq!(Packet::decode(&bytes), Err(PacketError::SymbolCount));
    }
}
