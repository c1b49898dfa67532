//! Line-oriented configuration console
//!
//! Lines arrive from the UART on the board or stdin on the host and are
//! executed between loop iterations, never inside a symbol.

pub mod commands;
pub mod error;
pub mod parser;

pub use commands::{command_names, execute, handle_line, ConsoleTarget, LinkStats, Persist, Session, COMMANDS};
pub use error::ConsoleError;
pub use parser::{parse_line, ParsedCommand};
