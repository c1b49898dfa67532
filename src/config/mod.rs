//! Module: config
//!
//! Purpose: Keyer configuration, the durable settings projection and the
//! paddle-driven adjustment steps.
//!
//! Architecture:
//! - [`KeyerConfig`]: scalar keyer state (speed, tone, personality)
//! - [`Settings`]: config plus the three message programs, what the store persists
//! - [`store`]: typed packet log over a [`ByteStore`](crate::hal::ByteStore)
//! - [`nvs`]: byte store backends (RAM, file, ESP-IDF NVS)

pub mod nvs;
pub mod store;

pub use store::{LoadOutcome, SettingsStore};

use crate::program::MessageProgram;

pub const UNIT_MIN_MS: u16 = 20;
pub const UNIT_MAX_MS: u16 = 800;
pub const UNIT_DEFAULT_MS: u16 = 60;

pub const TONE_MIN_HZ: u16 = 30;
pub const TONE_MAX_HZ: u16 = 12500;
pub const TONE_DEFAULT_HZ: u16 = 700;

/// Number of message memories.
pub const MEMORY_SLOTS: usize = 3;

/// Keyer personality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum KeyerMode {
    /// Automatic dits and dahs, squeeze alternates.
    #[default]
    Iambic,
    /// Automatic dits, manual dahs ("bug").
    Vibroplex,
    /// Dit contact keys the output directly.
    Straight,
}

impl KeyerMode {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyerMode::Iambic => "iambic",
            KeyerMode::Vibroplex => "vibroplex",
            KeyerMode::Straight => "straight",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "iambic" | "i" => Some(KeyerMode::Iambic),
            "vibroplex" | "bug" | "v" => Some(KeyerMode::Vibroplex),
            "straight" | "s" => Some(KeyerMode::Straight),
            _ => None,
        }
    }

    /// Letter announced when the mode is switched from the selector.
    pub fn announce_char(self) -> char {
        match self {
            KeyerMode::Iambic => 'I',
            KeyerMode::Vibroplex => 'V',
            KeyerMode::Straight => 'S',
        }
    }
}

/// Scalar keyer state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyerConfig {
    /// Dit length in milliseconds.
    pub unit_ms: u16,
    pub tone_hz: u16,
    pub mode: KeyerMode,
    /// Mode B squeeze completion. Not persisted.
    pub iambic_mode_b: bool,
}

impl Default for KeyerConfig {
    fn default() -> Self {
        Self {
            unit_ms: UNIT_DEFAULT_MS,
            tone_hz: TONE_DEFAULT_HZ,
            mode: KeyerMode::Iambic,
            iambic_mode_b: true,
        }
    }
}

impl KeyerConfig {
    /// PARIS speed: WPM = 1200 / unit.
    #[inline]
    pub fn wpm(&self) -> u16 {
        1200 / self.unit_ms.max(1)
    }

    /// Unit length for a speed, `None` outside the unit range.
    pub fn unit_for_wpm(wpm: u16) -> Option<u16> {
        if wpm == 0 {
            return None;
        }
        let unit = 1200 / wpm;
        (UNIT_MIN_MS..=UNIT_MAX_MS).contains(&unit).then_some(unit)
    }

    pub fn speed_up(&mut self) {
        self.unit_ms = scale_down(self.unit_ms, 100, 105, UNIT_MIN_MS);
    }

    pub fn slow_down(&mut self) {
        self.unit_ms = scale_up(self.unit_ms, 105, 100, UNIT_MAX_MS);
    }

    pub fn tone_down(&mut self) {
        self.tone_hz = scale_down(self.tone_hz, 10, 11, TONE_MIN_HZ);
    }

    pub fn tone_up(&mut self) {
        self.tone_hz = scale_up(self.tone_hz, 11, 10, TONE_MAX_HZ);
    }
}

/// Scale by `num/den` (< 1), stepping at least one, clamped at `lower`.
pub fn scale_down(orig: u16, num: u32, den: u32, lower: u16) -> u16 {
    let mut scaled = (u32::from(orig) * num / den) as u16;
    if scaled == orig {
        scaled = scaled.saturating_sub(1);
    }
    scaled.max(lower)
}

/// Scale by `num/den` (> 1), stepping at least one, clamped at `upper`.
pub fn scale_up(orig: u16, num: u32, den: u32, upper: u16) -> u16 {
    let scaled = (u32::from(orig) * num / den).min(u32::from(u16::MAX)) as u16;
    let scaled = if scaled == orig { scaled.saturating_add(1) } else { scaled };
    scaled.min(upper)
}

/// Memory slot, 1-based on the selector and console.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    One,
    Two,
    Three,
}

impl Slot {
    pub const ALL: [Slot; MEMORY_SLOTS] = [Slot::One, Slot::Two, Slot::Three];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Slot::One => 0,
            Slot::Two => 1,
            Slot::Three => 2,
        }
    }

    /// Selector position or console number, 1..=3.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Slot::One),
            2 => Some(Slot::Two),
            3 => Some(Slot::Three),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }
}

/// Durable projection: configuration plus the three memories.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Settings {
    pub config: KeyerConfig,
    pub memories: [MessageProgram; MEMORY_SLOTS],
}

impl Settings {
    pub fn memory(&self, slot: Slot) -> &MessageProgram {
        &self.memories[slot.index()]
    }

    pub fn memory_mut(&mut self, slot: Slot) -> &mut MessageProgram {
        &mut self.memories[slot.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = KeyerConfig::default();
        assert_eq!(cfg.unit_ms, 60);
        assert_eq!(cfg.wpm(), 20);
        assert_eq!(cfg.tone_hz, 700);
        assert_eq!(cfg.mode, KeyerMode::Iambic);
        assert!(cfg.iambic_mode_b);
    }

    #[test]
    fn test_speed_steps() {
        let mut cfg = KeyerConfig::default();
        cfg.speed_up();
        assert_eq!(cfg.unit_ms, 57);
        cfg.slow_down();
        assert_eq!(cfg.unit_ms, 59);
    }

    #[test]
    fn test_small_values_still_move() {
        // 21 * 100 / 105 = 20, 20 would stay 20 so it steps and clamps
        assert_eq!(scale_down(21, 100, 105, 20), 20);
        assert_eq!(scale_down(20, 100, 105, 20), 20);
        // 30 * 105 / 100 = 31
        assert_eq!(scale_up(30, 105, 100, 800), 31);
        // 10 * 105 / 100 = 10, forced to 11
        assert_eq!(scale_up(10, 105, 100, 800), 11);
    }

    #[test]
    fn test_clamps() {
        let mut cfg = KeyerConfig { unit_ms: 790, tone_hz: 12000, ..Default::default() };
        cfg.slow_down();
        assert_eq!(cfg.unit_ms, 800);
        cfg.tone_up();
        assert_eq!(cfg.tone_hz, 12500);

        let mut cfg = KeyerConfig { tone_hz: 31, ..Default::default() };
        cfg.tone_down();
        assert_eq!(cfg.tone_hz, 30);
    }

    #[test]
    fn test_unit_for_wpm() {
        assert_eq!(KeyerConfig::unit_for_wpm(20), Some(60));
        assert_eq!(KeyerConfig::unit_for_wpm(60), Some(20));
        assert_eq!(KeyerConfig::unit_for_wpm(61), None);
        assert_eq!(KeyerConfig::unit_for_wpm(0), None);
        assert_eq!(KeyerConfig::unit_for_wpm(1), None);
    }

    #[test]
    fn test_slot_numbers() {
        assert_eq!(Slot::from_number(2), Some(Slot::Two));
        assert_eq!(Slot::from_number(0), None);
        assert_eq!(Slot::Three.number(), 3);
    }
}
