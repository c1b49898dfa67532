//! Server-side jitter buffer.
//!
//! Bounded FIFO of received frames with playback gating:
//! - armed once more than [`PREBUFFER_DEPTH`] frames are queued,
//!   or by a keepalive arriving while frames are queued
//! - once armed it drains while non-empty and stays armed until a
//!   keepalive finds it empty
//!
//! When full the oldest frame is discarded so the newest always fits.

use heapless::Deque;

use super::packet::Packet;

pub const JITTER_CAPACITY: usize = 10;

/// Depth that must be exceeded before playback starts on its own.
pub const PREBUFFER_DEPTH: usize = 2;

#[derive(Debug, Default)]
pub struct JitterBuffer {
    frames: Deque<Packet, JITTER_CAPACITY>,
    armed: bool,
}

impl JitterBuffer {
    pub const fn new() -> Self {
        Self { frames: Deque::new(), armed: false }
    }

    /// Queue a frame. Returns the frame evicted to make room, if any.
    pub fn push(&mut self, frame: Packet) -> Option<Packet> {
        let evicted = if self.frames.is_full() { self.frames.pop_front() } else { None };
        // Cannot fail: a slot was freed above if needed.
        let _ = self.frames.push_back(frame);
        if self.frames.len() > PREBUFFER_DEPTH {
            self.armed = true;
        }
        evicted
    }

    /// Keepalive round-trip: arm iff something is queued.
    pub fn on_keepalive(&mut self) {
        self.armed = !self.frames.is_empty();
    }

    /// Next frame to play, if playback is armed.
    pub fn pop_ready(&mut self) -> Option<Packet> {
        if self.armed {
            self.frames.pop_front()
        } else {
            None
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.armed
    }
}
