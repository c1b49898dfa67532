//! # RustNetCWKeyer
//!
//! Networked CW keyer: iambic A/B, vibroplex and straight keying, three
//! recorded message memories, a persistent settings log and a UDP relay
//! that carries live keying from a client to a sounding server.
//!
//! ## Architecture
//!
//! One cooperative loop owns a [`Keyer`] (board + settings + keying state).
//! Every timed element goes through [`Keyer::play_symbol`]; its waits
//! busy-poll the abort contacts. Around it:
//! - [`control`]: idle / speed / tone state machine and memory buttons
//! - [`config`]: keyer settings and the append-only settings log
//! - [`net`]: frame packing, jitter buffer and gap replay
//! - [`console`]: line commands over serial or stdin
//!
//! Boards implement the narrow traits in [`hal`]; core code never touches
//! hardware directly.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod config;
pub mod console;
pub mod control;
pub mod diag;
pub mod hal;
pub mod keyer;
pub mod log_drain;
pub mod log_globals;
pub mod logging;
pub mod morse;
pub mod net;
pub mod node;
pub mod program;
pub mod symbol;
pub mod timing;

pub use config::{KeyerConfig, KeyerMode, Settings, SettingsStore, Slot};
pub use control::{Control, ControlState};
pub use diag::{DiagEvent, DIAG};
pub use hal::{Board, ByteStore, Contact};
pub use keyer::Keyer;
pub use net::{Role, Station};
pub use node::Node;
pub use program::MessageProgram;
pub use symbol::{GpioState, Symbol};
