//! Settings and memory log.
//!
//! # Region layout
//!
//! ```text
//! 0..3   reserved (wear-levelling header)
//! 3, 4   magic 182, 97
//! 5..    packet log, terminated by END
//! ```
//!
//! # Packets
//!
//! | Type | Name              | Payload                  |
//! |------|-------------------|--------------------------|
//! | 0    | END               | -                        |
//! | 1    | SPEED             | `u16` BE unit ms         |
//! | 2    | FREQ              | `u16` BE tone Hz         |
//! | 3    | KEYERMODE_IAMBIC  | -                        |
//! | 4    | KEYERMODE_VIBRO   | -                        |
//! | 5    | KEYERMODE_STRAIGHT| -                        |
//! | 20.. | MEM0..MEM2        | `u16` BE length, bytes   |
//!
//! Setters append one packet and move END behind it; superseded packets stay
//! until an append would overflow the region, then the whole log is rebuilt
//! from the in-memory state.

use crate::config::{KeyerMode, Settings, Slot, TONE_MAX_HZ, TONE_MIN_HZ, UNIT_MAX_MS, UNIT_MIN_MS};
use crate::diag::{DiagEvent, DIAG};
use crate::hal::{ByteStore, StorageError};
use crate::program::{MessageProgram, PROGRAM_CAPACITY};
use crate::logging::last_stamp;
use crate::{log_info, log_warn};

/// Bytes of the region the log may use.
pub const REGION_SIZE: usize = 2048;

pub const MAGIC_OFFSET: usize = 3;
pub const MAGIC: [u8; 2] = [182, 97];

/// First packet byte.
pub const LOG_START: usize = 5;

pub const PACKET_END: u8 = 0;
pub const PACKET_SPEED: u8 = 1;
pub const PACKET_FREQ: u8 = 2;
pub const PACKET_MODE_IAMBIC: u8 = 3;
pub const PACKET_MODE_VIBROPLEX: u8 = 4;
pub const PACKET_MODE_STRAIGHT: u8 = 5;
pub const PACKET_MEM0: u8 = 20;
pub const PACKET_MEM1: u8 = 21;
pub const PACKET_MEM2: u8 = 22;

/// What `open` found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Log read up to END.
    Loaded,
    /// Magic missing or reset requested; log now empty, defaults in effect.
    FactoryReset,
    /// Log was damaged; rewritten from what could be read.
    Repaired,
}

/// One logical packet, encoded against the current settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Entry {
    Speed(u16),
    Freq(u16),
    Mode(KeyerMode),
    Memory(Slot),
}

impl Entry {
    fn kind(self) -> u8 {
        match self {
            Entry::Speed(_) => PACKET_SPEED,
            Entry::Freq(_) => PACKET_FREQ,
            Entry::Mode(mode) => mode_packet(mode),
            Entry::Memory(slot) => PACKET_MEM0 + slot.index() as u8,
        }
    }

    fn encoded_len(self, settings: &Settings) -> usize {
        match self {
            Entry::Speed(_) | Entry::Freq(_) => 3,
            Entry::Mode(_) => 1,
            Entry::Memory(slot) => 3 + settings.memory(slot).len(),
        }
    }
}

fn mode_packet(mode: KeyerMode) -> u8 {
    match mode {
        KeyerMode::Iambic => PACKET_MODE_IAMBIC,
        KeyerMode::Vibroplex => PACKET_MODE_VIBROPLEX,
        KeyerMode::Straight => PACKET_MODE_STRAIGHT,
    }
}

/// A packet as found in the region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogRecord {
    pub kind: u8,
    /// Offset of the type byte.
    pub offset: usize,
    /// Total encoded length including the type byte.
    pub len: usize,
}

/// Settings log over a byte store.
pub struct SettingsStore<S: ByteStore> {
    store: S,
    cursor: usize,
}

impl<S: ByteStore> SettingsStore<S> {
    /// Validate the region and load it into `settings`.
    ///
    /// Factory reset when `reset_requested` or the magic does not match.
    pub fn open(store: S, settings: &mut Settings, reset_requested: bool) -> (Self, LoadOutcome) {
        let mut this = Self { store, cursor: LOG_START };

        if reset_requested || !this.magic_ok() {
            if let Err(e) = this.factory_reset(settings) {
                log_warn!(last_stamp(), "factory reset not committed: {}", e);
            }
            return (this, LoadOutcome::FactoryReset);
        }

        let outcome = this.load(settings);
        (this, outcome)
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Offset of the END packet.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Usable bytes of the region.
    pub fn region_len(&self) -> usize {
        self.store.len().min(REGION_SIZE)
    }

    fn magic_ok(&self) -> bool {
        self.store.read(MAGIC_OFFSET) == MAGIC[0] && self.store.read(MAGIC_OFFSET + 1) == MAGIC[1]
    }

    /// Write magic and an empty log; reset `settings` to defaults.
    pub fn factory_reset(&mut self, settings: &mut Settings) -> Result<(), StorageError> {
        *settings = Settings::default();
        self.store.write(MAGIC_OFFSET, MAGIC[0])?;
        self.store.write(MAGIC_OFFSET + 1, MAGIC[1])?;
        self.store.write(LOG_START, PACKET_END)?;
        self.cursor = LOG_START;
        DIAG.record(DiagEvent::FactoryReset);
        log_info!(last_stamp(), "settings: factory reset");
        self.commit()
    }

    /// Apply packets until END.
    ///
    /// Values are clamped to their ranges and oversize memories truncated.
    /// An unknown type or a packet running off the region stops the walk and
    /// the log is rewritten from what was applied.
    pub fn load(&mut self, settings: &mut Settings) -> LoadOutcome {
        let region = self.region_len();
        let mut offset = LOG_START;

        let damaged = loop {
            if offset >= region {
                break true;
            }
            match self.store.read(offset) {
                PACKET_END => break false,
                kind @ (PACKET_SPEED | PACKET_FREQ) => {
                    if offset + 3 > region {
                        break true;
                    }
                    let value = self.read_u16(offset + 1);
                    if kind == PACKET_SPEED {
                        settings.config.unit_ms = value.clamp(UNIT_MIN_MS, UNIT_MAX_MS);
                    } else {
                        settings.config.tone_hz = value.clamp(TONE_MIN_HZ, TONE_MAX_HZ);
                    }
                    offset += 3;
                }
                PACKET_MODE_IAMBIC => {
                    settings.config.mode = KeyerMode::Iambic;
                    offset += 1;
                }
                PACKET_MODE_VIBROPLEX => {
                    settings.config.mode = KeyerMode::Vibroplex;
                    offset += 1;
                }
                PACKET_MODE_STRAIGHT => {
                    settings.config.mode = KeyerMode::Straight;
                    offset += 1;
                }
                kind @ PACKET_MEM0..=PACKET_MEM2 => {
                    if offset + 3 > region {
                        break true;
                    }
                    let len = self.read_u16(offset + 1) as usize;
                    if offset + 3 + len > region {
                        break true;
                    }
                    if len > PROGRAM_CAPACITY {
                        log_warn!(
                            last_stamp(),
                            "settings: memory {} truncated {} -> {}",
                            kind - PACKET_MEM0 + 1,
                            len,
                            PROGRAM_CAPACITY
                        );
                    }
                    let program = &mut settings.memories[(kind - PACKET_MEM0) as usize];
                    program.clear();
                    for i in 0..len.min(PROGRAM_CAPACITY) {
                        program.push(self.store.read(offset + 3 + i));
                    }
                    offset += 3 + len;
                }
                other => {
                    log_warn!(last_stamp(), "settings: unknown packet {} at {}", other, offset);
                    break true;
                }
            }
        };

        if damaged {
            DIAG.record(DiagEvent::StoreRepaired);
            log_warn!(last_stamp(), "settings: log damaged at {}, rewriting", offset);
            if let Err(e) = self.dump(settings) {
                log_warn!(last_stamp(), "settings: rewrite failed: {}", e);
            }
            return LoadOutcome::Repaired;
        }

        self.cursor = offset;
        LoadOutcome::Loaded
    }

    pub fn save_speed(&mut self, settings: &Settings) -> Result<(), StorageError> {
        self.append(Entry::Speed(settings.config.unit_ms), settings)
    }

    pub fn save_tone(&mut self, settings: &Settings) -> Result<(), StorageError> {
        self.append(Entry::Freq(settings.config.tone_hz), settings)
    }

    pub fn save_mode(&mut self, settings: &Settings) -> Result<(), StorageError> {
        self.append(Entry::Mode(settings.config.mode), settings)
    }

    pub fn save_memory(&mut self, slot: Slot, settings: &Settings) -> Result<(), StorageError> {
        self.append(Entry::Memory(slot), settings)
    }

    /// Rebuild the log from `settings` in canonical order with one commit.
    ///
    /// Order: speed, freq, non-default mode, non-empty memories. A packet
    /// that cannot fit is skipped.
    pub fn dump(&mut self, settings: &Settings) -> Result<(), StorageError> {
        self.cursor = LOG_START;

        let mut entries: heapless::Vec<Entry, 6> = heapless::Vec::new();
        let _ = entries.push(Entry::Speed(settings.config.unit_ms));
        let _ = entries.push(Entry::Freq(settings.config.tone_hz));
        if settings.config.mode != KeyerMode::Iambic {
            let _ = entries.push(Entry::Mode(settings.config.mode));
        }
        for slot in Slot::ALL {
            if !settings.memory(slot).is_empty() {
                let _ = entries.push(Entry::Memory(slot));
            }
        }

        for entry in entries {
            if !self.fits(entry, settings) {
                log_warn!(last_stamp(), "settings: packet {} does not fit, skipped", entry.kind());
                continue;
            }
            self.write_entry(entry, settings)?;
        }
        self.store.write(self.cursor, PACKET_END)?;

        DIAG.record(DiagEvent::StoreRewritten);
        log_info!(last_stamp(), "settings: log rewritten, {} bytes", self.cursor);
        self.commit()
    }

    /// Walk the packets currently in the region.
    pub fn records(&self) -> Records<'_, S> {
        Records { store: &self.store, offset: LOG_START, region: self.region_len() }
    }

    fn append(&mut self, entry: Entry, settings: &Settings) -> Result<(), StorageError> {
        if !self.fits(entry, settings) {
            return self.dump(settings);
        }
        self.write_entry(entry, settings)?;
        self.store.write(self.cursor, PACKET_END)?;
        self.commit()
    }

    // Packet plus the END behind it.
    fn fits(&self, entry: Entry, settings: &Settings) -> bool {
        self.cursor + entry.encoded_len(settings) < self.region_len()
    }

    fn write_entry(&mut self, entry: Entry, settings: &Settings) -> Result<(), StorageError> {
        self.put(entry.kind())?;
        match entry {
            Entry::Speed(v) | Entry::Freq(v) => self.put_u16(v),
            Entry::Mode(_) => Ok(()),
            Entry::Memory(slot) => {
                let program = settings.memory(slot);
                self.put_u16(program.len() as u16)?;
                for &b in program.as_bytes() {
                    self.put(b)?;
                }
                Ok(())
            }
        }
    }

    fn put(&mut self, byte: u8) -> Result<(), StorageError> {
        self.store.write(self.cursor, byte)?;
        self.cursor += 1;
        Ok(())
    }

    fn put_u16(&mut self, value: u16) -> Result<(), StorageError> {
        let [hi, lo] = value.to_be_bytes();
        self.put(hi)?;
        self.put(lo)
    }

    fn read_u16(&self, offset: usize) -> u16 {
        u16::from_be_bytes([self.store.read(offset), self.store.read(offset + 1)])
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        self.store.commit().inspect_err(|e| {
            DIAG.record(DiagEvent::CommitFailed);
            log_warn!(last_stamp(), "settings: {}", e);
        })
    }
}

/// Iterator over the packets of a region, stops at END or damage.
pub struct Records<'a, S: ByteStore> {
    store: &'a S,
    offset: usize,
    region: usize,
}

impl<S: ByteStore> Iterator for Records<'_, S> {
    type Item = LogRecord;

    fn next(&mut self) -> Option<LogRecord> {
        if self.offset >= self.region {
            return None;
        }
        let kind = self.store.read(self.offset);
        let len = match kind {
            PACKET_END => return None,
            PACKET_SPEED | PACKET_FREQ => 3,
            PACKET_MODE_IAMBIC..=PACKET_MODE_STRAIGHT => 1,
            PACKET_MEM0..=PACKET_MEM2 => {
                let hi = self.store.read(self.offset + 1);
                let lo = self.store.read(self.offset + 2);
                3 + u16::from_be_bytes([hi, lo]) as usize
            }
            _ => return None,
        };
        let record = LogRecord { kind, offset: self.offset, len };
        self.offset += len;
        Some(record)
    }
}

/// Decoded payload for SPEED / FREQ records.
pub fn record_value<S: ByteStore>(store: &S, record: &LogRecord) -> u16 {
    u16::from_be_bytes([store.read(record.offset + 1), store.read(record.offset + 2)])
}

/// Memory bytes of a MEM record.
pub fn record_program<S: ByteStore>(store: &S, record: &LogRecord) -> MessageProgram {
    let mut program = MessageProgram::new();
    for i in 3..record.len {
        program.push(store.read(record.offset + i));
    }
    program
}
