//! Log output side.
//!
//! Drains a [`LogStream`] into any `core::fmt::Write` sink: the UART console
//! on the board, stdout on the host. Runs where blocking is acceptable,
//! never inside a symbol wait.
//!
//! Line format: `[timestamp_ms] LEVEL: message`

use core::fmt::Write;

use crate::logging::{LogEntry, LogStream};

/// Format one entry as a line.
pub fn format_entry<W: Write + ?Sized>(entry: &LogEntry, out: &mut W) -> core::fmt::Result {
    writeln!(out, "[{:10}] {}: {}", entry.timestamp_ms, entry.level.as_str(), entry.message())
}

/// Drain everything currently published. Returns the number of lines written.
///
/// Drops since the last call are reported as one extra WARN line.
pub fn drain<const N: usize, W: Write + ?Sized>(stream: &LogStream<N>, out: &mut W) -> usize {
    let mut lines = 0;
    while let Some(entry) = stream.drain() {
        let _ = format_entry(&entry, out);
        lines += 1;
    }

    let dropped = stream.dropped();
    if dropped > 0 {
        let _ = writeln!(out, "[WARN] dropped {} log lines", dropped);
        stream.reset_dropped();
        lines += 1;
    }
    lines
}

/// `fmt::Write` adapter over stdout.
#[cfg(feature = "std")]
pub struct StdoutWriter;

#[cfg(feature = "std")]
impl Write for StdoutWriter {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        use std::io::Write as _;
        std::io::stdout().write_all(s.as_bytes()).map_err(|_| core::fmt::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;

    #[test]
    fn test_format_entry() {
        let mut msg = [0u8; crate::logging::MAX_MSG_LEN];
        msg[..11].copy_from_slice(b"Hello world");
        let entry = LogEntry { timestamp_ms: 1234567, level: LogLevel::Info, len: 11, msg };

        let mut out = String::new();
        format_entry(&entry, &mut out).unwrap();
        assert_eq!(out, "[   1234567] INFO: Hello world\n");
    }

    #[test]
    fn test_format_truncated_message() {
        let mut msg = [0u8; crate::logging::MAX_MSG_LEN];
        msg[..10].copy_from_slice(b"TEST12345X");
        let entry = LogEntry { timestamp_ms: 999, level: LogLevel::Error, len: 5, msg };

        let mut out = String::new();
        format_entry(&entry, &mut out).unwrap();
        assert!(out.contains("ERROR"));
        assert!(out.contains("TEST1"));
        assert!(!out.contains('X'));
    }

    #[test]
    fn test_drain_reports_drops() {
        let stream = LogStream::<2>::new();
        stream.push(1, LogLevel::Warn, b"a");
        stream.push(2, LogLevel::Warn, b"b");
        stream.push(3, LogLevel::Warn, b"c");

        let mut out = String::new();
        assert_eq!(drain(&stream, &mut out), 3);
        assert!(out.contains("WARN: a"));
        assert!(out.contains("WARN: b"));
        assert!(out.contains("dropped 1 log lines"));
        assert_eq!(stream.dropped(), 0);
    }
}
