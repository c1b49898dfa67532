//! Boot sequence and the main loop body shared by every binary.

use core::fmt::Write;

use crate::config::{LoadOutcome, Settings, SettingsStore};
use crate::console::{handle_line, Session};
use crate::control::Control;
use crate::hal::{sample_paddles, Board, ByteStore, Contact};
use crate::keyer::Keyer;
use crate::log_info;
use crate::net::{Role, Station, Uplink};

/// Pause between the speed announcement and the role letter.
pub const BOOT_PAUSE_MS: u32 = 250;

/// A running keyer: context, settings log, control machine and role.
pub struct Node<B: Board, S: ByteStore> {
    pub keyer: Keyer<B>,
    pub store: SettingsStore<S>,
    pub control: Control,
    pub station: Station,
    outcome: LoadOutcome,
}

impl<B: Board, S: ByteStore> Node<B, S> {
    /// Load settings and announce speed and role.
    ///
    /// Both paddles closed at power-up request a factory reset. A network
    /// role whose link could not be opened keys "NO PORT" and runs local.
    pub fn boot(mut board: B, store: S, role: Role, link_ready: bool) -> Self {
        let reset_requested = sample_paddles(&mut board).both();

        let mut settings = Settings::default();
        let (store, outcome) = SettingsStore::open(store, &mut settings, reset_requested);
        let now = board.now_ms();
        log_info!(
            now,
            "settings {:?}: {} wpm, {} Hz, {}",
            outcome,
            settings.config.wpm(),
            settings.config.tone_hz,
            settings.config.mode.as_str()
        );

        let mut keyer = Keyer::new(board, settings);
        if outcome == LoadOutcome::FactoryReset {
            keyer.announce_factory_reset();
        }
        if reset_requested {
            keyer.wait_release(Contact::Dit);
            keyer.wait_release(Contact::Dah);
        }

        keyer.play_speed();
        keyer.delay(BOOT_PAUSE_MS);

        let role = if role != Role::Disconnected && !link_ready {
            log_info!(keyer.now_ms(), "{} link unavailable, running local", role.as_str());
            keyer.play_text("NO PORT", false);
            Role::Disconnected
        } else {
            let mut buf = [0u8; 4];
            keyer.play_text(role.announce_char().encode_utf8(&mut buf), false);
            role
        };

        if role == Role::Client {
            let now = keyer.now_ms();
            keyer = keyer.with_uplink(Uplink::new(now));
        }
        log_info!(keyer.now_ms(), "role {}", role.as_str());

        Self { keyer, store, control: Control::new(), station: Station::new(role), outcome }
    }

    pub fn outcome(&self) -> LoadOutcome {
        self.outcome
    }

    pub fn role(&self) -> Role {
        self.station.role()
    }

    /// One loop iteration.
    pub fn tick(&mut self) {
        self.station.tick(&mut self.keyer, &mut self.control, &mut self.store);
    }

    /// Run a console line. Refused (false) while a setting is being adjusted.
    pub fn console(&mut self, line: &str, out: &mut dyn Write) -> bool {
        if !self.control.is_idle() {
            return false;
        }
        let mut session = Session::new(&mut self.keyer, &mut self.store);
        let _ = handle_line(line, &mut session, out);
        true
    }
}
