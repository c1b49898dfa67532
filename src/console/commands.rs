//! Command handlers
//!
//! Handlers act on a [`ConsoleTarget`], which the main loop implements with
//! [`Session`] over the live keyer and settings store.

use core::fmt::Write;

use super::parser::{parse_line, ParsedCommand};
use super::ConsoleError;
use crate::config::{KeyerConfig, KeyerMode, Settings, SettingsStore, Slot, TONE_MAX_HZ, TONE_MIN_HZ, UNIT_MAX_MS, UNIT_MIN_MS};
use crate::diag::DIAG;
use crate::hal::{Board, ByteStore, StorageError};
use crate::keyer::Keyer;
use crate::log_globals::LOG_STREAM;
use crate::logging::{self, LogLevel};
use crate::program::MessageProgram;

/// Which part of the settings a command changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Persist {
    Speed,
    Tone,
    Mode,
    Memory(Slot),
    /// Rewrite the whole log.
    All,
}

/// Link counters shown by `stats`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub frames_sent: u32,
    pub acks: u32,
    pub last_ack_ms: Option<u64>,
}

/// What console commands operate on.
pub trait ConsoleTarget {
    fn settings(&self) -> &Settings;
    fn settings_mut(&mut self) -> &mut Settings;
    fn persist(&mut self, what: Persist) -> Result<(), StorageError>;
    fn factory_reset(&mut self) -> Result<(), StorageError>;
    /// Key text with transmit on.
    fn send_text(&mut self, text: &str);
    fn play_memory(&mut self, slot: Slot);
    fn link_stats(&self) -> Option<LinkStats>;
    /// Offset of the END packet in the settings log.
    fn store_cursor(&self) -> usize;
    fn now_ms(&self) -> u64;
}

/// Live keyer plus its settings store.
pub struct Session<'a, B: Board, S: ByteStore> {
    pub keyer: &'a mut Keyer<B>,
    pub store: &'a mut SettingsStore<S>,
}

impl<'a, B: Board, S: ByteStore> Session<'a, B, S> {
    pub fn new(keyer: &'a mut Keyer<B>, store: &'a mut SettingsStore<S>) -> Self {
        Self { keyer, store }
    }
}

impl<B: Board, S: ByteStore> ConsoleTarget for Session<'_, B, S> {
    fn settings(&self) -> &Settings {
        self.keyer.settings()
    }

    fn settings_mut(&mut self) -> &mut Settings {
        self.keyer.settings_mut()
    }

    fn persist(&mut self, what: Persist) -> Result<(), StorageError> {
        let settings = self.keyer.settings();
        match what {
            Persist::Speed => self.store.save_speed(settings),
            Persist::Tone => self.store.save_tone(settings),
            Persist::Mode => self.store.save_mode(settings),
            Persist::Memory(slot) => self.store.save_memory(slot, settings),
            Persist::All => self.store.dump(settings),
        }
    }

    fn factory_reset(&mut self) -> Result<(), StorageError> {
        self.store.factory_reset(self.keyer.settings_mut())
    }

    fn send_text(&mut self, text: &str) {
        self.keyer.play_text(text, true);
        self.keyer.flush_uplink();
    }

    fn play_memory(&mut self, slot: Slot) {
        self.keyer.play_memory(slot);
    }

    fn link_stats(&self) -> Option<LinkStats> {
        self.keyer.uplink().map(|up| LinkStats {
            frames_sent: up.frames_sent(),
            acks: up.acks(),
            last_ack_ms: up.last_ack_ms(),
        })
    }

    fn store_cursor(&self) -> usize {
        self.store.cursor()
    }

    fn now_ms(&self) -> u64 {
        self.keyer.now_ms()
    }
}

type Handler = fn(&ParsedCommand<'_>, &mut dyn ConsoleTarget, &mut dyn Write) -> Result<(), ConsoleError>;

/// Command descriptor
pub struct CommandDescriptor {
    pub name: &'static str,
    pub brief: &'static str,
    pub handler: Handler,
}

/// All available commands
pub static COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor { name: "help", brief: "List commands", handler: cmd_help },
    CommandDescriptor { name: "show", brief: "Show keyer settings", handler: cmd_show },
    CommandDescriptor { name: "set", brief: "set wpm|unit|tone|mode|modeb <value>", handler: cmd_set },
    CommandDescriptor { name: "send", brief: "Key text on the air", handler: cmd_send },
    CommandDescriptor { name: "play", brief: "Play memory 1-3", handler: cmd_play },
    CommandDescriptor { name: "store", brief: "store <1-3> <text>", handler: cmd_store },
    CommandDescriptor { name: "save", brief: "Rewrite the settings log", handler: cmd_save },
    CommandDescriptor { name: "factory-reset", brief: "Erase settings and memories", handler: cmd_factory_reset },
    CommandDescriptor { name: "stats", brief: "Link and diagnostic counters", handler: cmd_stats },
    CommandDescriptor { name: "debug", brief: "Show or set log level", handler: cmd_debug },
    CommandDescriptor { name: "version", brief: "Firmware version", handler: cmd_version },
];

/// Execute a parsed command
pub fn execute(
    cmd: &ParsedCommand<'_>,
    target: &mut dyn ConsoleTarget,
    out: &mut dyn Write,
) -> Result<(), ConsoleError> {
    if cmd.command.is_empty() {
        return Ok(()); // Empty line, do nothing
    }

    let handler = COMMANDS
        .iter()
        .find(|c| c.name == cmd.command)
        .ok_or(ConsoleError::UnknownCommand)?;

    (handler.handler)(cmd, target, out)
}

/// Parse and execute one line, reporting errors on `out`.
pub fn handle_line(line: &str, target: &mut dyn ConsoleTarget, out: &mut dyn Write) -> Result<(), ConsoleError> {
    let cmd = parse_line(line);
    let result = execute(&cmd, target, out);
    if let Err(e) = result {
        let _ = writeln!(out, "{}", e);
    }
    result
}

/// Get all command names
pub fn command_names() -> impl Iterator<Item = &'static str> {
    COMMANDS.iter().map(|c| c.name)
}

// --- Command Implementations ---

fn cmd_help(cmd: &ParsedCommand<'_>, _target: &mut dyn ConsoleTarget, out: &mut dyn Write) -> Result<(), ConsoleError> {
    if let Some(name) = cmd.arg(0) {
        // Help for specific command
        if let Some(c) = COMMANDS.iter().find(|c| c.name == name) {
            let _ = writeln!(out, "{}: {}", c.name, c.brief);
        } else {
            return Err(ConsoleError::UnknownCommand);
        }
    } else {
        // List all commands
        for c in COMMANDS {
            let _ = writeln!(out, "  {:<14} {}", c.name, c.brief);
        }
    }
    Ok(())
}

fn cmd_show(_cmd: &ParsedCommand<'_>, target: &mut dyn ConsoleTarget, out: &mut dyn Write) -> Result<(), ConsoleError> {
    let settings = target.settings();
    let config = &settings.config;
    let _ = writeln!(out, "wpm={}", config.wpm());
    let _ = writeln!(out, "unit={}", config.unit_ms);
    let _ = writeln!(out, "tone={}", config.tone_hz);
    let _ = writeln!(out, "mode={}", config.mode.as_str());
    let _ = writeln!(out, "modeb={}", if config.iambic_mode_b { "on" } else { "off" });
    for slot in Slot::ALL {
        let _ = writeln!(out, "mem{}={} bytes", slot.number(), settings.memory(slot).len());
    }
    Ok(())
}

fn cmd_set(cmd: &ParsedCommand<'_>, target: &mut dyn ConsoleTarget, out: &mut dyn Write) -> Result<(), ConsoleError> {
    let name = cmd.arg(0).ok_or(ConsoleError::MissingArg)?;
    let value = cmd.arg(1).ok_or(ConsoleError::MissingArg)?;

    let persist = match name {
        "wpm" => {
            let wpm: u16 = value.parse().map_err(|_| ConsoleError::InvalidValue)?;
            let unit = KeyerConfig::unit_for_wpm(wpm).ok_or(ConsoleError::OutOfRange)?;
            target.settings_mut().config.unit_ms = unit;
            Some(Persist::Speed)
        }
        "unit" => {
            let unit: u16 = value.parse().map_err(|_| ConsoleError::InvalidValue)?;
            if !(UNIT_MIN_MS..=UNIT_MAX_MS).contains(&unit) {
                return Err(ConsoleError::OutOfRange);
            }
            target.settings_mut().config.unit_ms = unit;
            Some(Persist::Speed)
        }
        "tone" => {
            let hz: u16 = value.parse().map_err(|_| ConsoleError::InvalidValue)?;
            if !(TONE_MIN_HZ..=TONE_MAX_HZ).contains(&hz) {
                return Err(ConsoleError::OutOfRange);
            }
            target.settings_mut().config.tone_hz = hz;
            Some(Persist::Tone)
        }
        "mode" => {
            let mode = KeyerMode::parse(value).ok_or(ConsoleError::InvalidValue)?;
            target.settings_mut().config.mode = mode;
            Some(Persist::Mode)
        }
        "modeb" => {
            let on = match value {
                "true" | "1" | "on" => true,
                "false" | "0" | "off" => false,
                _ => return Err(ConsoleError::InvalidValue),
            };
            target.settings_mut().config.iambic_mode_b = on;
            None
        }
        _ => return Err(ConsoleError::UnknownCommand),
    };

    if let Some(what) = persist {
        target.persist(what)?;
    }
    let _ = writeln!(out, "{}={}", name, value);
    Ok(())
}

fn parse_slot(cmd: &ParsedCommand<'_>) -> Result<Slot, ConsoleError> {
    let raw = cmd.arg(0).ok_or(ConsoleError::MissingArg)?;
    let n: u8 = raw.parse().map_err(|_| ConsoleError::InvalidValue)?;
    Slot::from_number(n).ok_or(ConsoleError::OutOfRange)
}

fn cmd_send(cmd: &ParsedCommand<'_>, target: &mut dyn ConsoleTarget, _out: &mut dyn Write) -> Result<(), ConsoleError> {
    let text = cmd.rest_from(0).ok_or(ConsoleError::MissingArg)?;
    target.send_text(text);
    Ok(())
}

fn cmd_play(cmd: &ParsedCommand<'_>, target: &mut dyn ConsoleTarget, _out: &mut dyn Write) -> Result<(), ConsoleError> {
    let slot = parse_slot(cmd)?;
    target.play_memory(slot);
    Ok(())
}

fn cmd_store(cmd: &ParsedCommand<'_>, target: &mut dyn ConsoleTarget, out: &mut dyn Write) -> Result<(), ConsoleError> {
    let slot = parse_slot(cmd)?;
    let text = cmd.rest_from(1).ok_or(ConsoleError::MissingArg)?;
    let program = MessageProgram::from_text(text);
    let len = program.len();
    *target.settings_mut().memory_mut(slot) = program;
    target.persist(Persist::Memory(slot))?;
    let _ = writeln!(out, "mem{}: {} bytes", slot.number(), len);
    Ok(())
}

fn cmd_save(_cmd: &ParsedCommand<'_>, target: &mut dyn ConsoleTarget, out: &mut dyn Write) -> Result<(), ConsoleError> {
    target.persist(Persist::All)?;
    let _ = writeln!(out, "saved");
    Ok(())
}

fn cmd_factory_reset(cmd: &ParsedCommand<'_>, target: &mut dyn ConsoleTarget, out: &mut dyn Write) -> Result<(), ConsoleError> {
    if cmd.arg(0) != Some("confirm") {
        return Err(ConsoleError::RequiresConfirm);
    }
    target.factory_reset()?;
    let _ = writeln!(out, "settings erased");
    Ok(())
}

fn cmd_stats(_cmd: &ParsedCommand<'_>, target: &mut dyn ConsoleTarget, out: &mut dyn Write) -> Result<(), ConsoleError> {
    let now = target.now_ms();
    let _ = writeln!(out, "uptime: {}s", now / 1000);
    if let Some(link) = target.link_stats() {
        let _ = writeln!(out, "frames sent: {}", link.frames_sent);
        let _ = write!(out, "acks: {}", link.acks);
        match link.last_ack_ms {
            Some(at) => {
                let _ = writeln!(out, " (last {} ms ago)", now.saturating_sub(at));
            }
            None => {
                let _ = writeln!(out);
            }
        }
    }
    let _ = writeln!(out, "store: {} bytes used", target.store_cursor());
    let _ = writeln!(out, "log dropped: {}", LOG_STREAM.dropped());
    for (event, count) in DIAG.snapshot().iter() {
        let _ = writeln!(out, "{}: {}", event.name(), count);
    }
    Ok(())
}

fn cmd_debug(cmd: &ParsedCommand<'_>, _target: &mut dyn ConsoleTarget, out: &mut dyn Write) -> Result<(), ConsoleError> {
    if let Some(raw) = cmd.arg(0) {
        let level = LogLevel::parse(raw).ok_or(ConsoleError::InvalidValue)?;
        logging::set_max_level(level);
    }
    let _ = writeln!(out, "log level: {}", logging::max_level().as_str());
    Ok(())
}

fn cmd_version(_cmd: &ParsedCommand<'_>, _target: &mut dyn ConsoleTarget, out: &mut dyn Write) -> Result<(), ConsoleError> {
    let _ = writeln!(out, "{}", env!("VERSION_STRING"));
    Ok(())
}
