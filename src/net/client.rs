//! Client side of the relay: frames keyed symbols and keeps the link alive.

use super::framer::Framer;
use super::packet::{Packet, PacketKind};
use crate::diag::{DiagEvent, DIAG};
use crate::hal::Transport;
use crate::symbol::Symbol;
use crate::{log_debug, log_warn};

/// Silence after which a keepalive is sent.
pub const KEEPALIVE_INTERVAL_MS: u64 = 1000;

/// Uplink state owned by the keyer in the client role.
#[derive(Debug)]
pub struct Uplink {
    framer: Framer,
    last_sent_ms: u64,
    acks: u32,
    last_ack_ms: Option<u64>,
    frames_sent: u32,
}

impl Uplink {
    /// Start the keepalive clock at `now_ms`.
    pub fn new(now_ms: u64) -> Self {
        Self { framer: Framer::new(), last_sent_ms: now_ms, acks: 0, last_ack_ms: None, frames_sent: 0 }
    }

    /// Queue a keyed symbol. Returns `false` if the frame is full and must
    /// be flushed first.
    pub fn push(&mut self, symbol: Symbol) -> bool {
        self.framer.push(symbol)
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        !self.framer.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.framer.is_full()
    }

    /// Send the pending frame, if any, carrying `gap_ms`.
    pub fn flush<T: Transport + ?Sized>(&mut self, transport: &mut T, gap_ms: u64, now_ms: u64) -> bool {
        let Some(frame) = self.framer.take(gap_ms) else {
            return false;
        };
        log_debug!(
            now_ms,
            "uplink: frame {} ({} symbols, gap {} ms)",
            frame.sequence(),
            frame.symbol_count(),
            frame.gap_ms()
        );
        self.frames_sent += 1;
        self.send(transport, frame, now_ms);
        true
    }

    /// Send a keepalive after [`KEEPALIVE_INTERVAL_MS`] of silence with the
    /// paddles idle and nothing pending. Returns `true` when one was sent;
    /// the caller then resets its symbol-end time.
    pub fn maybe_keepalive<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        now_ms: u64,
        paddles_idle: bool,
        unit_ms: u16,
    ) -> bool {
        if !paddles_idle || self.has_pending() {
            return false;
        }
        if now_ms.saturating_sub(self.last_sent_ms) <= KEEPALIVE_INTERVAL_MS {
            return false;
        }
        self.send(transport, Packet::keepalive(unit_ms), now_ms);
        true
    }

    /// Handle a datagram from the server. Only ACKs mean anything here.
    pub fn on_datagram(&mut self, bytes: &[u8; 8], now_ms: u64) {
        match Packet::decode(bytes).and_then(|p| p.kind()) {
            Ok(PacketKind::Ack) => {
                self.acks += 1;
                self.last_ack_ms = Some(now_ms);
            }
            Ok(_) => {}
            Err(e) => {
                DIAG.record(DiagEvent::MalformedPacket);
                log_debug!(now_ms, "uplink: dropped datagram: {}", e);
            }
        }
    }

    pub fn acks(&self) -> u32 {
        self.acks
    }

    pub fn last_ack_ms(&self) -> Option<u64> {
        self.last_ack_ms
    }

    pub fn frames_sent(&self) -> u32 {
        self.frames_sent
    }

    pub fn last_sent_ms(&self) -> u64 {
        self.last_sent_ms
    }

    pub fn next_sequence(&self) -> u16 {
        self.framer.next_sequence()
    }

    // Keepalive clock advances on failure too.
    fn send<T: Transport + ?Sized>(&mut self, transport: &mut T, packet: Packet, now_ms: u64) {
        if let Err(e) = transport.send(&packet.to_bytes()) {
            DIAG.record(DiagEvent::SendFailed);
            log_warn!(now_ms, "uplink: {}", e);
        }
        self.last_sent_ms = now_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::sim::SimBoard;

    #[test]
    fn test_flush_sends_frame() {
        let mut board = SimBoard::new();
        let mut up = Uplink::new(0);
        up.push(Symbol::Dit);
        up.push(Symbol::Dah);
        assert!(up.flush(&mut board, 200, 50));
        assert!(!up.flush(&mut board, 200, 60));

        let sent = board.sent();
        assert_eq!(sent.len(), 1);
        let p = Packet::decode(&sent[0].1).unwrap();
        assert_eq!(p.sequence(), 1);
        assert_eq!(p.gap_ms(), 200);
        assert_eq!(p.codes(), 0x6000);
        assert_eq!(up.frames_sent(), 1);
    }

    #[test]
    fn test_keepalive_timing() {
        let mut board = SimBoard::new();
        let mut up = Uplink::new(0);
        assert!(!up.maybe_keepalive(&mut board, 1000, true, 60));
        assert!(!up.maybe_keepalive(&mut board, 1001, false, 60));
        assert!(up.maybe_keepalive(&mut board, 1001, true, 60));
        assert!(!up.maybe_keepalive(&mut board, 1500, true, 60));

        let p = Packet::decode(&board.sent()[0].1).unwrap();
        assert_eq!(p.kind(), Ok(PacketKind::KeepAlive));
        assert_eq!(p.unit_ms(), 60);
    }

    #[test]
    fn test_no_keepalive_with_pending_symbols() {
        let mut board = SimBoard::new();
        let mut up = Uplink::new(0);
        up.push(Symbol::Dit);
        assert!(!up.maybe_keepalive(&mut board, 5000, true, 60));
    }

    #[test]
    fn test_ack_counted() {
        let mut up = Uplink::new(0);
        up.on_datagram(&Packet::ack().to_bytes(), 1234);
        up.on_datagram(&Packet::keepalive(60).to_bytes(), 1300);
        assert_eq!(up.acks(), 1);
        assert_eq!(up.last_ack_ms(), Some(1234));
    }

    #[test]
    fn test_send_failure_counted() {
        let mut board = SimBoard::new();
        board.set_fail_sends(true);
        let mut up = Uplink::new(0);
        let before = DIAG.count(DiagEvent::SendFailed);
        up.push(Symbol::Dah);
        assert!(up.flush(&mut board, 0, 10));
        assert!(DIAG.count(DiagEvent::SendFailed) > before);
        assert!(board.sent().is_empty());
    }
}
