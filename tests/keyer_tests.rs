//! Keying state machine driven by scripted paddles
//!
//! Each test runs the sample/evaluate loop the way the idle control state
//! does, on a simulated board with a virtual clock.

use rust_net_cw_keyer::config::nvs::RamStore;
use rust_net_cw_keyer::config::store::{record_program, PACKET_MEM0, REGION_SIZE};
use rust_net_cw_keyer::config::{KeyerMode, LoadOutcome, Settings, SettingsStore, Slot};
use rust_net_cw_keyer::hal::sim::SimBoard;
use rust_net_cw_keyer::hal::Contact;
use rust_net_cw_keyer::net::{Packet, PacketKind, Uplink};
use rust_net_cw_keyer::program::{ProgramOp, PROGRAM_CAPACITY};
use rust_net_cw_keyer::symbol::GpioState;
use rust_net_cw_keyer::{Control, DiagEvent, Keyer, MessageProgram, Symbol, DIAG};

fn keyer_with(mode_b: bool) -> Keyer<SimBoard> {
    let mut settings = Settings::default();
    settings.config.iambic_mode_b = mode_b;
    Keyer::new(SimBoard::new(), settings)
}

/// Sample and evaluate the paddles until the virtual clock reaches `until_ms`.
fn run(keyer: &mut Keyer<SimBoard>, until_ms: u64) {
    while keyer.now_ms() < until_ms {
        let paddles = keyer.sample();
        keyer.process_paddles(paddles, true, None);
    }
}

fn durations(keyer: &Keyer<SimBoard>) -> Vec<u64> {
    keyer.board().tones().iter().map(|t| t.duration_ms()).collect()
}

#[test]
fn test_mode_b_completes_one_element() {
    let mut k = keyer_with(true);
    // Squeeze held through the latched dit, then released
    k.board_mut().press(Contact::Dit, 0, 300);
    k.board_mut().press(Contact::Dah, 0, 300);
    run(&mut k, 1500);

    // dah, latched dit, one completing dah, nothing more
    assert_eq!(durations(&k), vec![180, 60, 180]);
}

#[test]
fn test_mode_a_stops_on_release() {
    let mut k = keyer_with(false);
    k.board_mut().press(Contact::Dit, 0, 300);
    k.board_mut().press(Contact::Dah, 0, 300);
    run(&mut k, 1500);

    assert_eq!(durations(&k), vec![180, 60]);
}

#[test]
fn test_held_squeeze_alternates() {
    let mut k = keyer_with(true);
    k.board_mut().press(Contact::Dit, 0, 1000);
    k.board_mut().press(Contact::Dah, 0, 1000);
    run(&mut k, 900);

    let d = durations(&k);
    assert!(d.len() >= 4);
    for pair in d.windows(2) {
        assert_ne!(pair[0], pair[1], "squeeze must alternate: {:?}", d);
    }
}

#[test]
fn test_dit_tapped_during_dah_is_inserted() {
    let mut k = keyer_with(true);
    k.board_mut().press(Contact::Dah, 0, 150);
    k.board_mut().press(Contact::Dit, 100, 120);
    run(&mut k, 1000);

    assert_eq!(durations(&k), vec![180, 60]);
}

#[test]
fn test_held_dit_repeats() {
    let mut k = keyer_with(true);
    k.board_mut().press(Contact::Dit, 0, 500);
    run(&mut k, 1000);

    let d = durations(&k);
    assert!(d.len() >= 3);
    assert!(d.iter().all(|&ms| ms == 60));
}

#[test]
fn test_dit_dah_dit_timing_and_frame() {
    let mut k = keyer_with(true).with_uplink(Uplink::new(0));
    k.board_mut().press(Contact::Dit, 0, 50);
    k.board_mut().press(Contact::Dah, 123, 200);
    k.board_mut().press(Contact::Dit, 300, 330);
    run(&mut k, 1000);

    let tones = k.board().tones();
    let d: Vec<u64> = tones.iter().map(|t| t.duration_ms()).collect();
    assert_eq!(d, vec![60, 180, 60]);
    for pair in tones.windows(2) {
        let gap = pair[1].start_ms - pair[0].end_ms;
        // one unit plus the debounce sample
        assert!((60..=70).contains(&gap), "gap {}", gap);
    }

    let sent = k.board().sent();
    assert_eq!(sent.len(), 1);
    let frame = Packet::decode(&sent[0].1).unwrap();
    assert_eq!(frame.kind(), Ok(PacketKind::Frame));
    assert_eq!(frame.sequence(), 1);
    assert_eq!(frame.symbol_count(), 3);
    assert_eq!(frame.codes(), 0x6400);
    assert_eq!(frame.symbols().collect::<Vec<_>>(), vec![Symbol::Dit, Symbol::Dah, Symbol::Dit]);
}

#[test]
fn test_straight_key_has_no_frames() {
    let mut k = keyer_with(true).with_uplink(Uplink::new(0));
    k.settings_mut().config.mode = KeyerMode::Straight;
    k.board_mut().press(Contact::Dit, 0, 200);
    run(&mut k, 600);

    assert_eq!(k.board().keyed().len(), 1);
    assert!(k.board().sent().is_empty());
}

#[test]
fn test_recording_into_slot() {
    let mut k = keyer_with(true);
    k.board_mut().press(Contact::Dit, 0, 10);
    let paddles = k.sample();
    k.process_paddles(paddles, false, Some(Slot::Two));

    let ops: Vec<_> = k.settings().memory(Slot::Two).ops().collect();
    assert_eq!(ops, vec![ProgramOp::Symbol(Symbol::Dit)]);
    assert!(k.board().keyed().is_empty());
}

/// Lead-in of a recording: three dahs with spacing, 870 ms at 20 wpm.
const RECORD_START_MS: u64 = 870;

fn ops(keyer: &Keyer<SimBoard>, slot: Slot) -> Vec<ProgramOp> {
    keyer.settings().memory(slot).ops().collect()
}

#[test]
fn test_recording_starts_without_pause() {
    let mut k = keyer_with(true);
    k.board_mut().press(Contact::Dit, 1000, 1030);
    k.board_mut().press(Contact::Setup, 1500, 1550);
    k.record_memory(Slot::One);

    // Long silence after the lead-in is not recorded
    assert_eq!(ops(&k, Slot::One), vec![ProgramOp::Symbol(Symbol::Dit)]);
}

#[test]
fn test_recording_keeps_pause_between_elements() {
    let mut k = keyer_with(true);
    k.board_mut().press(Contact::Dit, 1000, 1030);
    k.board_mut().press(Contact::Dah, 1400, 1430);
    k.board_mut().press(Contact::Setup, 2000, 2050);
    k.record_memory(Slot::One);

    // About 280 ms between the dit ending and the dah closing: 14 ticks
    assert_eq!(
        ops(&k, Slot::One),
        vec![ProgramOp::Symbol(Symbol::Dit), ProgramOp::Pause(14), ProgramOp::Symbol(Symbol::Dah)]
    );
    assert_eq!(k.settings().memory(Slot::One).as_bytes(), &[0, 16, 1]);
    // Sidetone only while recording
    assert!(k.board().keyed().is_empty());
}

#[test]
fn test_setup_ends_recording() {
    let mut k = keyer_with(true);
    k.board_mut().press(Contact::Dah, 1000, 1030);
    k.board_mut().press(Contact::Setup, 1500, 1550);
    k.record_memory(Slot::Three);

    assert_eq!(ops(&k, Slot::Three), vec![ProgramOp::Symbol(Symbol::Dah)]);
    // Back after the setup release settles, with no element after it
    assert!(k.now_ms() >= 1550 && k.now_ms() < 1900, "returned at {}", k.now_ms());
    let tones = k.board().tones();
    assert!(tones.iter().all(|t| t.end_ms <= 1500));
}

#[test]
fn test_full_recording_is_truncated() {
    let mut k = keyer_with(true);
    let before = DIAG.count(DiagEvent::RecordingTruncated);
    // Held dit until the program runs out, no setup press
    k.board_mut().press(Contact::Dit, RECORD_START_MS + 30, u64::MAX);
    k.record_memory(Slot::Two);

    let memory = k.settings().memory(Slot::Two);
    assert_eq!(memory.len(), PROGRAM_CAPACITY);
    assert!(memory.as_bytes().iter().all(|&b| b == 0));
    assert!(DIAG.count(DiagEvent::RecordingTruncated) > before);
}

#[test]
fn test_selector_hold_records_and_saves() {
    let mut board = SimBoard::new();
    // Held past the long-press time: four dits, then recording
    board.select(1, 0, 1200);
    board.press(Contact::Dah, 4300, 4330);
    board.press(Contact::Setup, 5000, 5050);

    let mut settings = Settings::default();
    let (mut store, _) = SettingsStore::open(RamStore::<REGION_SIZE>::new(), &mut settings, false);
    let mut k = Keyer::new(board, settings);
    let mut control = Control::new();
    control.tick(&mut k, &mut store, GpioState::IDLE);

    let expected = MessageProgram::from_bytes(&[1]);
    assert_eq!(k.settings().memory(Slot::One), &expected);

    let last = store.records().last().unwrap();
    assert_eq!(last.kind, PACKET_MEM0);
    assert_eq!(record_program(store.inner(), &last), expected);

    let mut reloaded = Settings::default();
    let (_, outcome) = SettingsStore::open(store.into_inner(), &mut reloaded, false);
    assert_eq!(outcome, LoadOutcome::Loaded);
    assert_eq!(reloaded.memory(Slot::One), &expected);
}
