//! Server side of the relay: receives frames and replays them with the
//! sender's spacing.

use super::jitter::JitterBuffer;
use super::packet::{Packet, PacketKind};
use crate::diag::{DiagEvent, DIAG};
use crate::hal::Board;
use crate::keyer::Keyer;
use crate::{log_debug, log_info, log_warn};

/// Waits at or below this are skipped.
pub const MIN_SCHEDULE_WAIT_MS: i64 = 10;

/// Silence to insert before replaying a frame, if any.
///
/// `elapsed_ms` is the time since the last replayed symbol ended; one unit of
/// it was the inter-element gap already keyed.
pub fn schedule_delay(gap_ms: u16, elapsed_ms: u64, unit_ms: u16) -> Option<u32> {
    let unit = i64::from(unit_ms);
    let already = elapsed_ms.min(i64::MAX as u64) as i64 - unit;
    let gap = i64::from(gap_ms);
    if gap <= already {
        return None;
    }
    let wait = gap - already - 2 * unit;
    (wait > MIN_SCHEDULE_WAIT_MS).then_some(wait as u32)
}

/// Downlink state owned by the server station.
#[derive(Debug, Default)]
pub struct Downlink {
    jitter: JitterBuffer,
    last_sequence: Option<u16>,
    frames_received: u32,
}

impl Downlink {
    pub const fn new() -> Self {
        Self { jitter: JitterBuffer::new(), last_sequence: None, frames_received: 0 }
    }

    pub fn jitter(&self) -> &JitterBuffer {
        &self.jitter
    }

    pub fn frames_received(&self) -> u32 {
        self.frames_received
    }

    /// Drain every datagram waiting on the transport.
    pub fn poll<B: Board>(&mut self, keyer: &mut Keyer<B>) {
        while let Some(bytes) = keyer.board_mut().try_receive() {
            self.on_datagram(keyer, &bytes);
        }
    }

    fn on_datagram<B: Board>(&mut self, keyer: &mut Keyer<B>, bytes: &[u8; 8]) {
        let now = keyer.now_ms();
        let packet = match Packet::decode(bytes) {
            Ok(p) => p,
            Err(e) => {
                DIAG.record(DiagEvent::MalformedPacket);
                log_debug!(now, "downlink: dropped datagram: {}", e);
                return;
            }
        };

        match packet.kind() {
            Ok(PacketKind::KeepAlive) => {
                let unit = packet.unit_ms();
                if unit != keyer.config().unit_ms {
                    log_info!(now, "downlink: sender unit {} ms", unit);
                }
                keyer.settings_mut().config.unit_ms = unit;
                if let Err(e) = keyer.board_mut().send(&Packet::ack().to_bytes()) {
                    DIAG.record(DiagEvent::SendFailed);
                    log_warn!(now, "downlink: ack: {}", e);
                }
                self.jitter.on_keepalive();
            }
            Ok(PacketKind::Frame) => self.on_frame(packet, now),
            Ok(PacketKind::Ack) | Err(_) => {}
        }
    }

    fn on_frame(&mut self, frame: Packet, now: u64) {
        let seq = frame.sequence();
        if let Some(last) = self.last_sequence {
            let delta = seq.wrapping_sub(last);
            if delta > 1 && delta < 0x8000 {
                let lost = u32::from(delta - 1);
                DIAG.add(DiagEvent::FrameLost, lost);
                log_debug!(now, "downlink: {} frame(s) lost before {}", lost, seq);
            }
        }
        self.last_sequence = Some(seq);
        self.frames_received += 1;

        if self.jitter.push(frame).is_some() {
            DIAG.record(DiagEvent::FrameDropped);
            log_warn!(now, "downlink: jitter buffer full, oldest frame dropped");
        }
    }

    /// Replay the next frame if playback is armed. Returns `true` if one played.
    pub fn play_next<B: Board>(&mut self, keyer: &mut Keyer<B>) -> bool {
        let Some(frame) = self.jitter.pop_ready() else {
            return false;
        };
        let elapsed = keyer.now_ms().saturating_sub(keyer.last_symbol_end());
        if let Some(wait) = schedule_delay(frame.gap_ms(), elapsed, keyer.config().unit_ms) {
            keyer.delay(wait);
        }
        for symbol in frame.symbols() {
            keyer.play_symbol(symbol, true, &[]);
        }
        true
    }
}
