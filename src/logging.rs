//! Non-blocking logging for the keyer loop.
//!
//! # Architecture
//!
//! ```text
//! Keyer loop             LogStream            Drain
//! ──────────             ─────────            ─────
//!
//! log_info!() ─────────▶ [L0][L1][L2] ──────▶ UART / stdout
//! no alloc                lock-free           blocking ok
//! never blocks            ring buffer
//! ```
//!
//! # Rules
//!
//! - Symbol timing paths never print directly; they push to the ring.
//! - A full ring drops the message and counts it.
//! - Messages above the runtime max level are not formatted at all.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

/// Longer messages are cut.
pub const MAX_MSG_LEN: usize = 120;

/// Ring entries; must be a power of two.
pub const LOG_BUFFER_SIZE: usize = 256;

/// Severity, most severe first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// Parse a console level name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "error" => Some(LogLevel::Error),
            "warn" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

static MAX_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

// Last clock value seen by the loop, for callers without a clock.
static LAST_STAMP: AtomicU32 = AtomicU32::new(0);

/// Set the most verbose level that is recorded.
pub fn set_max_level(level: LogLevel) {
    MAX_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn max_level() -> LogLevel {
    LogLevel::from_u8(MAX_LEVEL.load(Ordering::Relaxed))
}

#[inline]
pub fn enabled(level: LogLevel) -> bool {
    level as u8 <= MAX_LEVEL.load(Ordering::Relaxed)
}

/// Remember the loop clock for [`last_stamp`].
#[inline]
pub fn stamp(now_ms: u64) {
    LAST_STAMP.store(now_ms as u32, Ordering::Relaxed);
}

/// Most recent loop time, truncated to 32 bits.
#[inline]
pub fn last_stamp() -> u64 {
    u64::from(LAST_STAMP.load(Ordering::Relaxed))
}

/// One formatted line waiting for the drain.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct LogEntry {
    /// Loop clock when the line was produced.
    pub timestamp_ms: u64,
    pub level: LogLevel,
    pub len: u8,
    /// UTF-8, `len` bytes used.
    pub msg: [u8; MAX_MSG_LEN],
}

impl LogEntry {
    const EMPTY: Self = Self {
        timestamp_ms: 0,
        level: LogLevel::Info,
        len: 0,
        msg: [0; MAX_MSG_LEN],
    };

    pub fn message(&self) -> &str {
        core::str::from_utf8(&self.msg[..self.len as usize]).unwrap_or("<invalid utf8>")
    }
}

impl Default for LogEntry {
    fn default() -> Self {
        Self::EMPTY
    }
}

struct Slot {
    // write index + 1 once the entry is fully written
    seq: AtomicU32,
    entry: UnsafeCell<LogEntry>,
}

/// Lock-free log stream (multiple producers, single consumer).
///
/// - Producers claim an index with compare-exchange, never block
/// - A slot is published by storing its sequence after the copy
/// - Drain runs wherever output is allowed to block
pub struct LogStream<const N: usize = LOG_BUFFER_SIZE> {
    slots: [Slot; N],
    write_idx: AtomicU32,
    read_idx: AtomicU32,
    dropped: AtomicU32,
}

// SAFETY: A slot is written only by the producer that claimed its index and
// read only by the single consumer after the producer published it.
unsafe impl<const N: usize> Sync for LogStream<N> {}
unsafe impl<const N: usize> Send for LogStream<N> {}

impl<const N: usize> LogStream<N> {
    const MASK: usize = N - 1;

    #[allow(clippy::declare_interior_mutable_const)]
    const EMPTY_SLOT: Slot = Slot {
        seq: AtomicU32::new(0),
        entry: UnsafeCell::new(LogEntry::EMPTY),
    };

    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "log ring size must be a power of two");

        Self {
            slots: [Self::EMPTY_SLOT; N],
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Queue a line without blocking. `false` means the ring was full and
    /// the line was counted as dropped.
    pub fn push(&self, timestamp_ms: u64, level: LogLevel, msg: &[u8]) -> bool {
        let mut write = self.write_idx.load(Ordering::Relaxed);
        loop {
            let read = self.read_idx.load(Ordering::Acquire);
            if write.wrapping_sub(read) >= N as u32 {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return false;
            }
            match self.write_idx.compare_exchange_weak(
                write,
                write.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => write = current,
            }
        }

        let slot = &self.slots[(write as usize) & Self::MASK];

        // SAFETY: index `write` is owned by this producer until published,
        // and the consumer has already released it (ring not full).
        unsafe {
            let entry = &mut *slot.entry.get();
            entry.timestamp_ms = timestamp_ms;
            entry.level = level;
            entry.len = msg.len().min(MAX_MSG_LEN) as u8;
            entry.msg[..entry.len as usize].copy_from_slice(&msg[..entry.len as usize]);
        }

        slot.seq.store(write.wrapping_add(1), Ordering::Release);
        true
    }

    /// Oldest published line. Single consumer only.
    pub fn drain(&self) -> Option<LogEntry> {
        let read = self.read_idx.load(Ordering::Relaxed);
        let slot = &self.slots[(read as usize) & Self::MASK];

        if slot.seq.load(Ordering::Acquire) != read.wrapping_add(1) {
            return None;
        }

        // SAFETY: published by its producer, not reclaimed until read_idx moves.
        let entry = unsafe { *slot.entry.get() };

        self.read_idx.store(read.wrapping_add(1), Ordering::Release);
        Some(entry)
    }

    /// Lines lost to a full ring since the last reset.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn reset_dropped(&self) {
        self.dropped.store(0, Ordering::Relaxed);
    }

    /// Number of claimed entries not yet drained.
    #[inline]
    pub fn pending(&self) -> u32 {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }
}

impl<const N: usize> Default for LogStream<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a message into a buffer, truncating at the end.
///
/// Returns the number of bytes written.
#[inline]
pub fn format_to_buffer(buf: &mut [u8], args: core::fmt::Arguments<'_>) -> usize {
    use core::fmt::Write;

    struct BufWriter<'a> {
        buf: &'a mut [u8],
        pos: usize,
    }

    impl Write for BufWriter<'_> {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            let bytes = s.as_bytes();
            let remaining = self.buf.len() - self.pos;
            let to_write = bytes.len().min(remaining);
            self.buf[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
            self.pos += to_write;
            Ok(())
        }
    }

    let mut writer = BufWriter { buf, pos: 0 };
    let _ = core::fmt::write(&mut writer, args);
    writer.pos
}

/// Log to the global stream at an explicit level.
///
/// ```ignore
/// log_at!(LogLevel::Info, now_ms, "unit {} ms", unit);
/// ```
#[macro_export]
macro_rules! log_at {
    ($level:expr, $timestamp:expr, $($arg:tt)*) => {{
        let level = $level;
        if $crate::logging::enabled(level) {
            let mut buf = [0u8; $crate::logging::MAX_MSG_LEN];
            let len = $crate::logging::format_to_buffer(&mut buf, format_args!($($arg)*));
            $crate::log_globals::LOG_STREAM.push($timestamp, level, &buf[..len]);
        }
    }};
}

#[macro_export]
macro_rules! log_error {
    ($timestamp:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::LogLevel::Error, $timestamp, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($timestamp:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::LogLevel::Warn, $timestamp, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($timestamp:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::LogLevel::Info, $timestamp, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($timestamp:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::LogLevel::Debug, $timestamp, $($arg)*)
    };
}

/// Per-symbol detail; off unless `debug trace` is set.
#[macro_export]
macro_rules! log_trace {
    ($timestamp:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::LogLevel::Trace, $timestamp, $($arg)*)
    };
}
