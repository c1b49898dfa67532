//! Global log stream instance.
//!
//! The keyer runs one cooperative loop, so a single stream is enough:
//! the loop (and any console helper thread) produce, the drain consumes.

use crate::logging::LogStream;

/// Process-wide log stream.
///
/// Producers: keyer loop, settings store, network roles.
/// Consumer: [`log_drain`](crate::log_drain) on the output side.
pub static LOG_STREAM: LogStream = LogStream::new();
