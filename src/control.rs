//! Setup button and memory selector handling.
//!
//! ```text
//!            setup press             setup press
//!   Idle ----------------> Speed -----------------> Idle (SPEED saved)
//!     |  setup held >= 1 s           setup press
//!     +------------------> Tone ------------------> Idle
//! ```
//!
//! While setup is held in Idle the selector switches the keyer mode
//! instead. In Idle a short selector press plays that memory; holding it
//! for a second records it.

use crate::config::{KeyerMode, SettingsStore, Slot};
use crate::hal::{Board, ByteStore, Contact, StorageError};
use crate::keyer::Keyer;
use crate::symbol::{GpioState, Symbol};
use crate::timing::Abort;
use crate::{log_info, log_warn};

/// Hold time that turns a press into a long press.
pub const LONG_PRESS_MS: u64 = 1000;

/// Spacing of the dits that confirm a long memory press.
const RECORD_BEEP_SPACING_MS: u32 = 500;

const SETUP_ABORT: [Abort; 1] = [Abort::closed(Contact::Setup)];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ControlState {
    #[default]
    Idle,
    SettingSpeed,
    SettingTone,
}

/// Secondary state machine on top of the keyer.
#[derive(Debug, Default)]
pub struct Control {
    state: ControlState,
}

impl Control {
    pub const fn new() -> Self {
        Self { state: ControlState::Idle }
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.state == ControlState::Idle
    }

    /// One loop iteration with a debounced paddle snapshot.
    pub fn tick<B: Board, S: ByteStore>(
        &mut self,
        keyer: &mut Keyer<B>,
        store: &mut SettingsStore<S>,
        paddles: GpioState,
    ) {
        match self.state {
            ControlState::Idle => self.idle(keyer, store, paddles),
            ControlState::SettingSpeed => self.setting_speed(keyer, store, paddles),
            ControlState::SettingTone => self.setting_tone(keyer, store, paddles),
        }
    }

    fn idle<B: Board, S: ByteStore>(&mut self, keyer: &mut Keyer<B>, store: &mut SettingsStore<S>, paddles: GpioState) {
        keyer.process_paddles(paddles, true, None);

        if keyer.board_mut().is_closed(Contact::Setup) {
            self.setup_pressed(keyer, store);
        }

        let selected = keyer.board_mut().selector();
        if let Some(slot) = Slot::from_number(selected) {
            memory_pressed(keyer, store, slot);
        }
    }

    fn setup_pressed<B: Board, S: ByteStore>(&mut self, keyer: &mut Keyer<B>, store: &mut SettingsStore<S>) {
        let pressed_at = keyer.now_ms();
        let mut next = ControlState::SettingSpeed;
        keyer.delay(5);

        while keyer.board_mut().is_closed(Contact::Setup) {
            if next == ControlState::SettingSpeed && keyer.now_ms() > pressed_at + LONG_PRESS_MS {
                next = ControlState::SettingTone;
                keyer.play_text("TONE", false);
            }

            let mode = match keyer.board_mut().selector() {
                1 => Some(KeyerMode::Iambic),
                2 => Some(KeyerMode::Straight),
                3 => Some(KeyerMode::Vibroplex),
                _ => None,
            };
            if let Some(mode) = mode {
                let mut buf = [0u8; 4];
                keyer.play_text(mode.announce_char().encode_utf8(&mut buf), false);
                keyer.settings_mut().config.mode = mode;
                log_info!(keyer.now_ms(), "mode: {}", mode.as_str());
                persist(keyer.now_ms(), store.save_mode(keyer.settings()));
                keyer.wait_release(Contact::Setup);
                next = ControlState::Idle;
                break;
            }
            keyer.board_mut().relax();
        }

        keyer.board_mut().set_status(false);
        self.state = next;
        keyer.delay(50);
    }

    fn setting_speed<B: Board, S: ByteStore>(
        &mut self,
        keyer: &mut Keyer<B>,
        store: &mut SettingsStore<S>,
        paddles: GpioState,
    ) {
        if keyer.play_symbol(Symbol::Dit, false, &SETUP_ABORT).is_some() {
            self.state = ControlState::Idle;
            log_info!(keyer.now_ms(), "speed: {} wpm ({} ms)", keyer.config().wpm(), keyer.config().unit_ms);
            persist(keyer.now_ms(), store.save_speed(keyer.settings()));
            keyer.wait_release(Contact::Setup);
            return;
        }

        let (mut dit, mut dah) = (paddles.dit(), paddles.dah());
        while dit || dah {
            let config = &mut keyer.settings_mut().config;
            if dit {
                config.speed_up();
            }
            if dah {
                config.slow_down();
            }
            match keyer.play_speed() {
                Some(Contact::Dit) => dit = true,
                Some(Contact::Dah) => dah = true,
                _ => {
                    dit = false;
                    dah = false;
                }
            }
        }
    }

    fn setting_tone<B: Board, S: ByteStore>(
        &mut self,
        keyer: &mut Keyer<B>,
        store: &mut SettingsStore<S>,
        paddles: GpioState,
    ) {
        if keyer.play_symbol(Symbol::Dit, false, &SETUP_ABORT).is_some() {
            self.state = ControlState::Idle;
            keyer.wait_release(Contact::Setup);
            return;
        }

        let before = keyer.config().tone_hz;
        let config = &mut keyer.settings_mut().config;
        if paddles.dit() {
            config.tone_down();
        }
        if paddles.dah() {
            config.tone_up();
        }
        if keyer.config().tone_hz != before {
            persist(keyer.now_ms(), store.save_tone(keyer.settings()));
        }
    }
}

/// Selector held on `slot`: play it, or record it after a long press.
fn memory_pressed<B: Board, S: ByteStore>(keyer: &mut Keyer<B>, store: &mut SettingsStore<S>, slot: Slot) {
    let pressed_at = keyer.now_ms();
    let mut record = false;
    keyer.delay(5);

    while keyer.board_mut().selector() == slot.number() {
        if keyer.now_ms() > pressed_at + LONG_PRESS_MS {
            for i in 0..4 {
                if i > 0 {
                    keyer.delay(RECORD_BEEP_SPACING_MS);
                }
                keyer.play_symbol(Symbol::Dit, false, &[]);
            }
            record = true;
        }
        keyer.board_mut().relax();
    }

    keyer.board_mut().set_status(false);
    keyer.delay(50);

    if record {
        keyer.record_memory(slot);
        persist(keyer.now_ms(), store.save_memory(slot, keyer.settings()));
        keyer.announce_recorded(slot);
    } else {
        keyer.play_memory(slot);
    }
}

fn persist(now_ms: u64, result: Result<(), StorageError>) {
    if let Err(e) = result {
        log_warn!(now_ms, "settings not saved: {}", e);
    }
}
