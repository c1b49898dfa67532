//! Simulated board for host tests.
//!
//! Contacts and selector follow a script of time intervals, the clock is
//! virtual and advances 1 ms per [`Clock::relax`], outputs and datagrams are
//! recorded with timestamps.

use std::collections::VecDeque;
use std::vec::Vec;

use super::{ByteStore, Clock, Contact, Contacts, Keying, StorageError, Transport, TransportError};

/// Output change recorded by the simulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputEvent {
    ToneOn(u16),
    ToneOff,
    Key(bool),
    Status(bool),
}

#[derive(Clone, Copy, Debug)]
struct Press {
    contact: Contact,
    from_ms: u64,
    until_ms: u64,
}

#[derive(Clone, Copy, Debug)]
struct Selection {
    value: u8,
    from_ms: u64,
    until_ms: u64,
}

/// A closed interval of an output, `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interval {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl Interval {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }
}

#[derive(Debug, Default)]
pub struct SimBoard {
    now_ms: u64,
    presses: Vec<Press>,
    selections: Vec<Selection>,
    events: Vec<(u64, OutputEvent)>,
    sent: Vec<(u64, [u8; 8])>,
    inbox: VecDeque<(u64, [u8; 8])>,
    fail_sends: bool,
}

impl SimBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold `contact` closed over `[from_ms, until_ms)`.
    pub fn press(&mut self, contact: Contact, from_ms: u64, until_ms: u64) {
        self.presses.push(Press { contact, from_ms, until_ms });
    }

    /// Hold the selector at `value` over `[from_ms, until_ms)`.
    pub fn select(&mut self, value: u8, from_ms: u64, until_ms: u64) {
        self.selections.push(Selection { value, from_ms, until_ms });
    }

    /// Queue a datagram that becomes receivable at `at_ms`.
    pub fn deliver(&mut self, at_ms: u64, datagram: [u8; 8]) {
        self.inbox.push_back((at_ms, datagram));
    }

    pub fn set_fail_sends(&mut self, fail: bool) {
        self.fail_sends = fail;
    }

    pub fn set_now(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
    }

    pub fn advance(&mut self, ms: u64) {
        self.now_ms += ms;
    }

    pub fn events(&self) -> &[(u64, OutputEvent)] {
        &self.events
    }

    pub fn sent(&self) -> &[(u64, [u8; 8])] {
        &self.sent
    }

    /// Tone intervals in order.
    pub fn tones(&self) -> Vec<Interval> {
        self.intervals(|ev| match ev {
            OutputEvent::ToneOn(_) => Some(true),
            OutputEvent::ToneOff => Some(false),
            _ => None,
        })
    }

    /// Rig keying intervals in order.
    pub fn keyed(&self) -> Vec<Interval> {
        self.intervals(|ev| match ev {
            OutputEvent::Key(down) => Some(down),
            _ => None,
        })
    }

    /// Frequencies passed to `start_tone`, in order.
    pub fn tone_frequencies(&self) -> Vec<u16> {
        self.events
            .iter()
            .filter_map(|(_, ev)| match ev {
                OutputEvent::ToneOn(hz) => Some(*hz),
                _ => None,
            })
            .collect()
    }

    fn intervals(&self, edge: impl Fn(OutputEvent) -> Option<bool>) -> Vec<Interval> {
        let mut out = Vec::new();
        let mut start: Option<u64> = None;
        for &(t, ev) in &self.events {
            match (edge(ev), start) {
                (Some(true), None) => start = Some(t),
                (Some(false), Some(s)) => {
                    out.push(Interval { start_ms: s, end_ms: t });
                    start = None;
                }
                _ => {}
            }
        }
        out
    }
}

impl Contacts for SimBoard {
    fn is_closed(&mut self, contact: Contact) -> bool {
        let now = self.now_ms;
        self.presses
            .iter()
            .any(|p| p.contact == contact && p.from_ms <= now && now < p.until_ms)
    }

    fn selector(&mut self) -> u8 {
        let now = self.now_ms;
        self.selections
            .iter()
            .find(|s| s.from_ms <= now && now < s.until_ms)
            .map(|s| s.value)
            .unwrap_or(0)
    }
}

impl Keying for SimBoard {
    fn start_tone(&mut self, hz: u16) {
        self.events.push((self.now_ms, OutputEvent::ToneOn(hz)));
    }

    fn stop_tone(&mut self) {
        self.events.push((self.now_ms, OutputEvent::ToneOff));
    }

    fn set_key(&mut self, down: bool) {
        self.events.push((self.now_ms, OutputEvent::Key(down)));
    }

    fn set_status(&mut self, on: bool) {
        self.events.push((self.now_ms, OutputEvent::Status(on)));
    }
}

impl Clock for SimBoard {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn relax(&mut self) {
        self.now_ms += 1;
    }
}

impl Transport for SimBoard {
    fn send(&mut self, datagram: &[u8; 8]) -> Result<(), TransportError> {
        if self.fail_sends {
            return Err(TransportError::SendFailed);
        }
        self.sent.push((self.now_ms, *datagram));
        Ok(())
    }

    fn try_receive(&mut self) -> Option<[u8; 8]> {
        match self.inbox.front() {
            Some(&(at, datagram)) if at <= self.now_ms => {
                self.inbox.pop_front();
                Some(datagram)
            }
            _ => None,
        }
    }
}

/// In-memory store that can be told to fail commits.
#[derive(Debug, Clone)]
pub struct FlakyStore {
    bytes: Vec<u8>,
    pub commits: u32,
    pub fail_commits: bool,
}

impl FlakyStore {
    pub fn new(len: usize) -> Self {
        Self { bytes: vec![0xFF; len], commits: 0, fail_commits: false }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl ByteStore for FlakyStore {
    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn read(&self, offset: usize) -> u8 {
        self.bytes.get(offset).copied().unwrap_or(0xFF)
    }

    fn write(&mut self, offset: usize, value: u8) -> Result<(), StorageError> {
        let slot = self.bytes.get_mut(offset).ok_or(StorageError::OutOfRange)?;
        *slot = value;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        if self.fail_commits {
            return Err(StorageError::CommitFailed);
        }
        self.commits += 1;
        Ok(())
    }
}
