//! Degradation counters.
//!
//! Nothing in the keyer is fatal: lost datagrams, a full jitter buffer, a
//! truncated recording or a damaged settings log all degrade to silence,
//! truncation or a rewrite. Each such event bumps a counter here so the
//! console can report what happened since boot.

use core::sync::atomic::{AtomicU32, Ordering};

/// Counted events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DiagEvent {
    /// Datagram send returned an error.
    SendFailed = 0,
    /// Jitter buffer full, oldest frame discarded.
    FrameDropped = 1,
    /// Sequence gap seen by the server.
    FrameLost = 2,
    /// Datagram with an invalid kind or symbol count.
    MalformedPacket = 3,
    /// Settings log rebuilt on overflow.
    StoreRewritten = 4,
    /// Settings log damaged on load.
    StoreRepaired = 5,
    /// Settings region reinitialised.
    FactoryReset = 6,
    /// Recording stopped at program capacity.
    RecordingTruncated = 7,
    /// Byte store refused a commit.
    CommitFailed = 8,
}

impl DiagEvent {
    pub const COUNT: usize = 9;

    pub const ALL: [DiagEvent; Self::COUNT] = [
        DiagEvent::SendFailed,
        DiagEvent::FrameDropped,
        DiagEvent::FrameLost,
        DiagEvent::MalformedPacket,
        DiagEvent::StoreRewritten,
        DiagEvent::StoreRepaired,
        DiagEvent::FactoryReset,
        DiagEvent::RecordingTruncated,
        DiagEvent::CommitFailed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DiagEvent::SendFailed => "send_failed",
            DiagEvent::FrameDropped => "frame_dropped",
            DiagEvent::FrameLost => "frame_lost",
            DiagEvent::MalformedPacket => "malformed_packet",
            DiagEvent::StoreRewritten => "store_rewritten",
            DiagEvent::StoreRepaired => "store_repaired",
            DiagEvent::FactoryReset => "factory_reset",
            DiagEvent::RecordingTruncated => "recording_truncated",
            DiagEvent::CommitFailed => "commit_failed",
        }
    }
}

/// Lock-free event counters. Never cleared implicitly.
pub struct Diagnostics {
    counts: [AtomicU32; DiagEvent::COUNT],
}

#[allow(clippy::declare_interior_mutable_const)]
const ZERO: AtomicU32 = AtomicU32::new(0);

impl Diagnostics {
    pub const fn new() -> Self {
        Self { counts: [ZERO; DiagEvent::COUNT] }
    }

    #[inline]
    pub fn record(&self, event: DiagEvent) {
        self.add(event, 1);
    }

    #[inline]
    pub fn add(&self, event: DiagEvent, n: u32) {
        self.counts[event as usize].fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn count(&self, event: DiagEvent) -> u32 {
        self.counts[event as usize].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> DiagSnapshot {
        let mut counts = [0u32; DiagEvent::COUNT];
        for (slot, counter) in counts.iter_mut().zip(self.counts.iter()) {
            *slot = counter.load(Ordering::Relaxed);
        }
        DiagSnapshot { counts }
    }

    pub fn reset(&self) {
        for counter in &self.counts {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide counters.
pub static DIAG: Diagnostics = Diagnostics::new();

/// Counters at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiagSnapshot {
    counts: [u32; DiagEvent::COUNT],
}

impl DiagSnapshot {
    pub fn get(&self, event: DiagEvent) -> u32 {
        self.counts[event as usize]
    }

    /// Non-zero counters, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (DiagEvent, u32)> + '_ {
        DiagEvent::ALL
            .iter()
            .map(move |&e| (e, self.get(e)))
            .filter(|&(_, n)| n > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_accumulate() {
        let diag = Diagnostics::new();
        diag.record(DiagEvent::FrameLost);
        diag.add(DiagEvent::FrameLost, 2);
        diag.record(DiagEvent::SendFailed);

        assert_eq!(diag.count(DiagEvent::FrameLost), 3);
        assert_eq!(diag.count(DiagEvent::CommitFailed), 0);

        let snap = diag.snapshot();
        let listed: Vec<_> = snap.iter().collect();
        assert_eq!(listed, vec![(DiagEvent::SendFailed, 1), (DiagEvent::FrameLost, 3)]);
    }

    #[test]
    fn test_reset() {
        let diag = Diagnostics::new();
        diag.record(DiagEvent::FactoryReset);
        diag.reset();
        assert_eq!(diag.count(DiagEvent::FactoryReset), 0);
    }
}
