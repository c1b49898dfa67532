//! Pin assignments for the supported boards.
//!
//! Contacts are wired to ground with internal pull-ups (active low). The
//! memory selector is a resistor ladder on one ADC input.

/// Paddle and button inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaddleConfig {
    pub dit_pin: i32,
    pub dah_pin: i32,
    pub setup_pin: i32,
    pub active_low: bool,
}

/// Rig keying output (MOSFET gate).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxConfig {
    pub pin: i32,
    pub active_high: bool,
}

/// Everything a board needs to know about its wiring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinMap {
    pub paddles: PaddleConfig,
    pub tx: TxConfig,
    pub status_led: i32,
    /// Piezo speaker, driven by LEDC.
    pub speaker: i32,
    /// ADC1 input of the selector ladder.
    pub selector: i32,
}

#[cfg(not(feature = "esp32p4"))]
pub const PINS: PinMap = PinMap {
    paddles: PaddleConfig { dit_pin: 4, dah_pin: 5, setup_pin: 6, active_low: true },
    tx: TxConfig { pin: 7, active_high: true },
    status_led: 15,
    speaker: 16,
    selector: 1,
};

#[cfg(feature = "esp32p4")]
pub const PINS: PinMap = PinMap {
    paddles: PaddleConfig { dit_pin: 20, dah_pin: 21, setup_pin: 22, active_low: true },
    tx: TxConfig { pin: 23, active_high: true },
    status_led: 24,
    speaker: 25,
    selector: 16,
};

impl PaddleConfig {
    /// Logical contact state for a raw pin level.
    #[inline]
    pub fn closed(&self, level_high: bool) -> bool {
        level_high != self.active_low
    }
}

impl TxConfig {
    /// Pin level for a key state.
    #[inline]
    pub fn level(&self, key_down: bool) -> bool {
        key_down == self.active_high
    }
}
