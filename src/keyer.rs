//! Keying state machine and the timed-symbol primitive.
//!
//! [`Keyer`] owns the board, the settings and all keying state. Everything
//! that produces sound goes through [`Keyer::play_symbol`]: live paddles,
//! text, memory playback and symbols relayed from the network.
//!
//! # Paddle evaluation
//!
//! [`Keyer::process_paddles`] runs exactly one branch per call:
//!
//! 1. a dit latched while a dah played is emitted
//! 2. squeeze (iambic): the element opposite the previous one
//! 3. dah: iambic dah, or manual keying in vibroplex mode
//! 4. dit: manual keying in straight mode, otherwise a dit
//! 5. idle: Mode B completion, partial frame flush, reset of the previous element

use crate::config::{KeyerConfig, KeyerMode, Settings, Slot};
use crate::diag::{DiagEvent, DIAG};
use crate::hal::{delay_ms, sample_paddles, Board, Contact};
use crate::morse;
use crate::net::client::Uplink;
use crate::program::{pause_byte_for, ticks_to_ms, ProgramOp, CHAR_PAUSE_TICKS, WORD_PAUSE_TICKS};
use crate::symbol::{GpioState, Symbol, SymbolEvent};
use crate::timing::{Abort, Wait, WaitStatus, PADDLE_ABORTS};
use crate::{log_debug, log_info};

/// Silence after which the next symbol starts a new gap.
pub const GAP_THRESHOLD_MS: u64 = 5;

/// Settle time after a contact released a wait.
pub const RELEASE_SETTLE_MS: u32 = 250;

/// Spacing of the three dahs that open a recording.
const RECORD_LEAD_IN_MS: u32 = 50;

/// Keyer context.
pub struct Keyer<B: Board> {
    board: B,
    settings: Settings,
    prev_symbol: Option<Symbol>,
    alternate_pending: bool,
    dit_detected: bool,
    last_symbol_end_ms: u64,
    gap_ms: u64,
    uplink: Option<Uplink>,
}

impl<B: Board> Keyer<B> {
    pub fn new(board: B, settings: Settings) -> Self {
        let now = board.now_ms();
        Self {
            board,
            settings,
            prev_symbol: None,
            alternate_pending: false,
            dit_detected: false,
            last_symbol_end_ms: now,
            gap_ms: 0,
            uplink: None,
        }
    }

    /// Attach the client uplink; frames are produced from then on.
    pub fn with_uplink(mut self, uplink: Uplink) -> Self {
        self.uplink = Some(uplink);
        self
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    #[inline]
    pub fn config(&self) -> &KeyerConfig {
        &self.settings.config
    }

    pub fn uplink(&self) -> Option<&Uplink> {
        self.uplink.as_ref()
    }

    #[inline]
    pub fn now_ms(&self) -> u64 {
        self.board.now_ms()
    }

    pub fn prev_symbol(&self) -> Option<Symbol> {
        self.prev_symbol
    }

    pub fn last_symbol_end(&self) -> u64 {
        self.last_symbol_end_ms
    }

    /// Gap captured before the most recent symbol that followed silence.
    pub fn gap_ms(&self) -> u64 {
        self.gap_ms
    }

    pub fn delay(&mut self, ms: u32) {
        delay_ms(&mut self.board, ms);
    }

    /// Debounced paddle snapshot.
    pub fn sample(&mut self) -> GpioState {
        sample_paddles(&mut self.board)
    }

    /// Send the partial frame, if any.
    pub fn flush_uplink(&mut self) {
        let now = self.board.now_ms();
        if let Some(uplink) = self.uplink.as_mut() {
            uplink.flush(&mut self.board, self.gap_ms, now);
        }
    }

    /// Client housekeeping: collect ACKs and send a keepalive when due.
    pub fn service_uplink(&mut self, paddles: GpioState) {
        let Some(uplink) = self.uplink.as_mut() else {
            return;
        };
        while let Some(bytes) = self.board.try_receive() {
            uplink.on_datagram(&bytes, self.board.now_ms());
        }
        let now = self.board.now_ms();
        if uplink.maybe_keepalive(&mut self.board, now, paddles.is_idle(), self.settings.config.unit_ms) {
            self.last_symbol_end_ms = now;
        }
    }

    /// Evaluate one paddle snapshot. `record` appends emitted symbols to
    /// that memory.
    pub fn process_paddles(&mut self, paddles: GpioState, transmit: bool, record: Option<Slot>) {
        let config = self.settings.config;
        let iambic = config.mode == KeyerMode::Iambic;

        if self.dit_detected {
            self.emit(Symbol::Dit, transmit, record);
            self.dit_detected = false;
            // Still squeezed: the inserted dit counts as a squeeze element for Mode B
            self.alternate_pending = config.iambic_mode_b && iambic && paddles.both();
        } else if iambic && paddles.both() {
            let symbol = self.squeeze_element();
            self.emit(symbol, transmit, record);
            if config.iambic_mode_b {
                self.alternate_pending = true;
            }
        } else if paddles.dah() && config.mode != KeyerMode::Straight {
            match config.mode {
                KeyerMode::Iambic => self.emit(Symbol::Dah, transmit, record),
                _ => self.key_manually(Contact::Dah, transmit),
            }
        } else if paddles.dit() {
            if self.prev_symbol == Some(Symbol::Dit) {
                self.dit_detected = false;
            }
            if config.mode == KeyerMode::Straight {
                self.key_manually(Contact::Dit, transmit);
            } else {
                self.emit(Symbol::Dit, transmit, record);
            }
        } else {
            if self.alternate_pending {
                let symbol = self.squeeze_element();
                self.emit(symbol, transmit, record);
                self.alternate_pending = false;
            }
            let now = self.board.now_ms();
            let idle = now.saturating_sub(self.last_symbol_end_ms) > u64::from(config.unit_ms);
            if idle {
                if let Some(uplink) = self.uplink.as_mut() {
                    uplink.flush(&mut self.board, self.gap_ms, now);
                }
            }
            self.prev_symbol = None;
        }
    }

    // DIT after a DAH, DAH otherwise.
    fn squeeze_element(&self) -> Symbol {
        match self.prev_symbol {
            Some(Symbol::Dah) => Symbol::Dit,
            _ => Symbol::Dah,
        }
    }

    fn emit(&mut self, symbol: Symbol, transmit: bool, record: Option<Slot>) {
        self.play_symbol(symbol, transmit, &[]);
        if let Some(slot) = record {
            // A full program ends the recording loop.
            let _ = self.settings.memory_mut(slot).push_op(ProgramOp::Symbol(symbol));
        }
    }

    /// Key one symbol followed by the inter-element gap.
    ///
    /// Returns the abort that cut it short, if any. The symbol is framed
    /// for the uplink even when aborted.
    pub fn play_symbol(&mut self, symbol: Symbol, transmit: bool, aborts: &[Abort]) -> Option<Abort> {
        let config = self.settings.config;
        let start = self.board.now_ms();
        let elapsed = start.saturating_sub(self.last_symbol_end_ms);
        if elapsed > GAP_THRESHOLD_MS {
            self.gap_ms = elapsed + u64::from(config.unit_ms);
        }
        self.prev_symbol = Some(symbol);

        let event = SymbolEvent { symbol, transmit, unit_ms: config.unit_ms };
        self.board.start_tone(config.tone_hz);
        self.board.set_status(true);
        if transmit {
            self.board.set_key(true);
        }

        let mut aborted = self.run_wait(Wait::for_ms(start, event.duration_ms()), aborts);

        self.board.stop_tone();
        self.board.set_status(false);
        self.board.set_key(false);

        if transmit && config.mode == KeyerMode::Iambic {
            let now = self.board.now_ms();
            if let Some(uplink) = self.uplink.as_mut() {
                uplink.push(symbol);
                if uplink.is_full() {
                    uplink.flush(&mut self.board, self.gap_ms, now);
                }
            }
        }

        if aborted.is_none() {
            let now = self.board.now_ms();
            aborted = self.run_wait(Wait::for_ms(now, u32::from(config.unit_ms)), aborts);
        }
        self.last_symbol_end_ms = self.board.now_ms();
        aborted
    }

    // Busy-poll `wait`, latching a dit closure while a dah is the previous element.
    fn run_wait(&mut self, wait: Wait, aborts: &[Abort]) -> Option<Abort> {
        loop {
            if self.prev_symbol == Some(Symbol::Dah) && !self.dit_detected {
                self.dit_detected = self.board.is_closed(Contact::Dit);
            }
            let now = self.board.now_ms();
            match wait.poll(now, &mut self.board, aborts) {
                WaitStatus::Continue => self.board.relax(),
                WaitStatus::Completed => return None,
                WaitStatus::Interrupted(abort) => return Some(abort),
            }
        }
    }

    /// Wait until `contact` opens, then let it settle.
    pub fn wait_release(&mut self, contact: Contact) {
        self.run_wait(Wait::until_abort(), &[Abort::released(contact)]);
        self.delay(RELEASE_SETTLE_MS);
    }

    /// Hold the outputs down while `contact` stays closed.
    pub fn key_manually(&mut self, contact: Contact, transmit: bool) {
        self.board.start_tone(self.settings.config.tone_hz);
        self.board.set_status(true);
        if transmit {
            self.board.set_key(true);
        }
        self.run_wait(Wait::until_abort(), &[Abort::released(contact)]);
        self.board.stop_tone();
        self.board.set_status(false);
        self.board.set_key(false);
    }

    /// Key `text` as Morse. A paddle press stops playback; the function
    /// then waits for that paddle to be released and returns its contact.
    pub fn play_text(&mut self, text: &str, transmit: bool) -> Option<Contact> {
        for c in text.chars() {
            if c == ' ' {
                self.delay(ticks_to_ms(WORD_PAUSE_TICKS, self.settings.config.unit_ms));
                continue;
            }
            if let Some(contact) = self.play_char(c, transmit) {
                return Some(contact);
            }
        }
        None
    }

    fn play_char(&mut self, c: char, transmit: bool) -> Option<Contact> {
        for symbol in morse::encode_char(c) {
            if let Some(abort) = self.play_symbol(symbol, transmit, &PADDLE_ABORTS) {
                self.wait_release(abort.contact);
                return Some(abort.contact);
            }
        }
        self.delay(ticks_to_ms(CHAR_PAUSE_TICKS, self.settings.config.unit_ms));
        None
    }

    /// Announce the current speed in WPM on the sidetone.
    pub fn play_speed(&mut self) -> Option<Contact> {
        let mut digits: heapless::String<8> = heapless::String::new();
        let _ = core::fmt::write(&mut digits, format_args!("{}", self.settings.config.wpm()));
        self.delay(RELEASE_SETTLE_MS);
        if let Some(contact) = self.play_text(&digits, false) {
            return Some(contact);
        }
        self.delay(RELEASE_SETTLE_MS);
        None
    }

    /// Record `slot` from the paddles until setup is pressed or the
    /// program is full. The slot is cleared first.
    pub fn record_memory(&mut self, slot: Slot) {
        self.settings.memory_mut(slot).clear();
        for _ in 0..3 {
            self.play_symbol(Symbol::Dah, false, &[]);
            self.delay(RECORD_LEAD_IN_MS);
        }
        log_info!(self.board.now_ms(), "memory {}: recording", slot.number());

        let mut first = true;
        loop {
            let paddles = self.sample();
            let now = self.board.now_ms();
            let silence = now.saturating_sub(self.last_symbol_end_ms);
            if !paddles.is_idle() && silence > u64::from(self.settings.config.unit_ms) {
                if first {
                    first = false;
                } else {
                    let pause = pause_byte_for(silence, self.settings.config.unit_ms);
                    let _ = self.settings.memory_mut(slot).push(pause);
                }
            }

            self.process_paddles(paddles, false, Some(slot));

            if self.settings.memory(slot).is_full() {
                DIAG.record(DiagEvent::RecordingTruncated);
                log_info!(self.board.now_ms(), "memory {}: full", slot.number());
                break;
            }
            if self.board.is_closed(Contact::Setup) {
                self.delay(RECORD_LEAD_IN_MS);
                self.wait_release(Contact::Setup);
                break;
            }
        }
        log_info!(
            self.board.now_ms(),
            "memory {}: recorded {} bytes",
            slot.number(),
            self.settings.memory(slot).len()
        );
    }

    /// Confirmation after a recording: two falling tones, then the slot
    /// number as status blinks over a high tone.
    pub fn announce_recorded(&mut self, slot: Slot) {
        self.board.start_tone(1300);
        self.delay(300);
        self.board.start_tone(900);
        self.delay(300);
        self.board.start_tone(2000);
        for _ in 0..slot.number() {
            self.board.set_status(true);
            self.delay(150);
            self.board.set_status(false);
            self.delay(150);
        }
        self.board.stop_tone();
    }

    /// Key a stored memory with transmit on. A paddle press aborts it.
    pub fn play_memory(&mut self, slot: Slot) {
        if self.settings.memory(slot).is_empty() {
            self.board.start_tone(800);
            self.delay(200);
            self.board.start_tone(500);
            self.delay(300);
            self.board.stop_tone();
            return;
        }
        log_debug!(self.board.now_ms(), "memory {}: playing", slot.number());

        let program = self.settings.memory(slot).clone();
        for op in program.ops() {
            match op {
                ProgramOp::Symbol(symbol) => {
                    if let Some(abort) = self.play_symbol(symbol, true, &PADDLE_ABORTS) {
                        self.wait_release(abort.contact);
                        return;
                    }
                }
                ProgramOp::Pause(ticks) => {
                    self.flush_uplink();
                    self.delay(ticks_to_ms(ticks, self.settings.config.unit_ms));
                }
            }
        }
        self.flush_uplink();
    }

    /// Factory reset jingle.
    pub fn announce_factory_reset(&mut self) {
        self.board.start_tone(900);
        self.delay(300);
        self.board.start_tone(600);
        self.delay(300);
        self.board.start_tone(1500);
        self.delay(900);
        self.board.stop_tone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::sim::SimBoard;
    use crate::net::packet::Packet;

    fn keyer() -> Keyer<SimBoard> {
        Keyer::new(SimBoard::new(), Settings::default())
    }

    #[test]
    fn test_dit_timing() {
        let mut k = keyer();
        k.board_mut().set_now(1000);
        assert_eq!(k.play_symbol(Symbol::Dit, true, &[]), None);
        let tones = k.board().tones();
        assert_eq!(tones.len(), 1);
        assert_eq!(tones[0].duration_ms(), 60);
        assert_eq!(k.board().keyed()[0].duration_ms(), 60);
        assert_eq!(k.last_symbol_end(), 1120);
        assert_eq!(k.gap_ms(), 1060);
    }

    #[test]
    fn test_sidetone_only_does_not_key() {
        let mut k = keyer();
        k.play_symbol(Symbol::Dah, false, &[]);
        assert_eq!(k.board().tones()[0].duration_ms(), 180);
        assert!(k.board().keyed().is_empty());
    }

    #[test]
    fn test_abort_cuts_symbol() {
        let mut k = keyer();
        k.board_mut().press(Contact::Setup, 20, 500);
        let abort = k.play_symbol(Symbol::Dah, false, &[Abort::closed(Contact::Setup)]);
        assert_eq!(abort, Some(Abort::closed(Contact::Setup)));
        assert_eq!(k.board().tones()[0].duration_ms(), 20);
    }

    #[test]
    fn test_dit_latched_during_dah() {
        let mut k = keyer();
        k.board_mut().press(Contact::Dit, 50, 60);
        k.play_symbol(Symbol::Dah, true, &[]);

        // Paddles now open: the latched dit still plays, exactly once.
        k.process_paddles(GpioState::IDLE, true, None);
        k.process_paddles(GpioState::IDLE, true, None);
        let tones = k.board().tones();
        assert_eq!(tones.len(), 2);
        assert_eq!(tones[1].duration_ms(), 60);
    }

    #[test]
    fn test_mode_a_has_no_completion() {
        let mut k = keyer();
        k.settings_mut().config.iambic_mode_b = false;
        k.process_paddles(GpioState::BOTH, true, None);
        k.process_paddles(GpioState::IDLE, true, None);
        assert_eq!(k.board().tones().len(), 1);
    }

    #[test]
    fn test_straight_keys_while_held() {
        let mut k = keyer();
        k.settings_mut().config.mode = KeyerMode::Straight;
        k.board_mut().press(Contact::Dit, 0, 137);
        k.process_paddles(GpioState::new(true, false), true, None);
        assert_eq!(k.board().keyed()[0].duration_ms(), 137);
        assert_eq!(k.prev_symbol(), None);
    }

    #[test]
    fn test_vibroplex_dah_manual_dit_automatic() {
        let mut k = keyer();
        k.settings_mut().config.mode = KeyerMode::Vibroplex;
        k.board_mut().press(Contact::Dah, 0, 400);
        k.process_paddles(GpioState::new(false, true), true, None);
        assert_eq!(k.board().tones()[0].duration_ms(), 400);

        k.process_paddles(GpioState::new(true, false), true, None);
        assert_eq!(k.board().tones()[1].duration_ms(), 60);
    }

    #[test]
    fn test_play_text_interrupted() {
        let mut k = keyer();
        k.board_mut().press(Contact::Dah, 30, 100);
        assert_eq!(k.play_text("TEST", false), Some(Contact::Dah));
        assert_eq!(k.board().tones().len(), 1);
        assert!(k.now_ms() >= 100 + u64::from(RELEASE_SETTLE_MS));
    }

    #[test]
    fn test_play_speed_digits() {
        let mut k = keyer();
        k.settings_mut().config.unit_ms = 60;
        assert_eq!(k.play_speed(), None);
        // "20": ..--- then -----
        assert_eq!(k.board().tones().len(), 10);
    }

    #[test]
    fn test_empty_memory_beeps() {
        let mut k = keyer();
        k.play_memory(Slot::Two);
        assert_eq!(k.board().tone_frequencies(), vec![800, 500]);
    }

    #[test]
    fn test_memory_playback_frames_each_word() {
        let mut k = keyer().with_uplink(Uplink::new(0));
        *k.settings_mut().memory_mut(Slot::One) = crate::program::MessageProgram::from_text("E T");
        k.play_memory(Slot::One);

        let frames: Vec<Packet> =
            k.board().sent().iter().map(|(_, b)| Packet::decode(b).unwrap()).collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].codes(), 0x4000);
        assert_eq!(frames[1].codes(), 0x8000);
        assert_eq!(frames[1].sequence(), 2);
    }
}
