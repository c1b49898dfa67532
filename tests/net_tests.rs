//! Relay tests: uplink framing, jitter gating and client-to-server replay

use rust_net_cw_keyer::config::Settings;
use rust_net_cw_keyer::hal::sim::SimBoard;
use rust_net_cw_keyer::net::jitter::JitterBuffer;
use rust_net_cw_keyer::net::{Downlink, Packet, PacketKind, Uplink};
use rust_net_cw_keyer::{GpioState, Keyer, Symbol};

fn client() -> Keyer<SimBoard> {
    Keyer::new(SimBoard::new(), Settings::default()).with_uplink(Uplink::new(0))
}

fn server() -> Keyer<SimBoard> {
    Keyer::new(SimBoard::new(), Settings::default())
}

fn frames(keyer: &Keyer<SimBoard>) -> Vec<Packet> {
    keyer
        .board()
        .sent()
        .iter()
        .filter_map(|(_, bytes)| Packet::decode(bytes).ok())
        .filter(|p| p.kind() == Ok(PacketKind::Frame))
        .collect()
}

#[test]
fn test_eight_symbols_fill_a_frame() {
    let mut k = client();
    for _ in 0..8 {
        k.play_symbol(Symbol::Dit, true, &[]);
    }

    let sent = frames(&k);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].symbol_count(), 8);
    assert_eq!(sent[0].codes(), 0x5555);
    assert_eq!(sent[0].sequence(), 1);
}

#[test]
fn test_partial_frame_flushed_after_idle_unit() {
    let mut k = client();
    for _ in 0..3 {
        k.play_symbol(Symbol::Dit, true, &[]);
    }

    // Still inside the unit: nothing goes out
    k.process_paddles(GpioState::IDLE, true, None);
    assert!(frames(&k).is_empty());

    k.board_mut().advance(61);
    k.process_paddles(GpioState::IDLE, true, None);
    let sent = frames(&k);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].symbol_count(), 3);
    assert_eq!(sent[0].codes(), 0x5400);
}

#[test]
fn test_sidetone_only_symbols_are_not_framed() {
    let mut k = client();
    k.play_symbol(Symbol::Dah, false, &[]);
    k.flush_uplink();
    assert!(frames(&k).is_empty());
}

#[test]
fn test_keepalive_after_idle_second() {
    let mut k = client();
    k.board_mut().set_now(900);
    k.service_uplink(GpioState::IDLE);
    assert!(k.board().sent().is_empty());

    k.board_mut().set_now(1001);
    k.service_uplink(GpioState::IDLE);
    let sent = k.board().sent();
    assert_eq!(sent.len(), 1);
    let packet = Packet::decode(&sent[0].1).unwrap();
    assert_eq!(packet.kind(), Ok(PacketKind::KeepAlive));
    assert_eq!(packet.unit_ms(), 60);
    assert_eq!(k.last_symbol_end(), 1001);

    // Not while a paddle is down
    k.board_mut().set_now(2500);
    k.service_uplink(GpioState::new(true, false));
    assert_eq!(k.board().sent().len(), 1);
}

#[test]
fn test_acks_are_counted() {
    let mut k = client();
    k.board_mut().deliver(10, Packet::ack().to_bytes());
    k.board_mut().set_now(20);
    k.service_uplink(GpioState::IDLE);

    let up = k.uplink().unwrap();
    assert_eq!(up.acks(), 1);
    assert_eq!(up.last_ack_ms(), Some(20));
}

#[test]
fn test_jitter_gating() {
    let mut jb = JitterBuffer::new();
    jb.push(Packet::frame(1, 0, 1, 0x4000));
    jb.push(Packet::frame(2, 0, 1, 0x4000));
    assert_eq!(jb.pop_ready(), None);

    jb.push(Packet::frame(3, 0, 1, 0x4000));
    assert_eq!(jb.pop_ready().map(|p| p.sequence()), Some(1));
    assert_eq!(jb.pop_ready().map(|p| p.sequence()), Some(2));
    assert_eq!(jb.pop_ready().map(|p| p.sequence()), Some(3));
    // Stays armed until a keepalive sees it empty
    assert!(jb.is_armed());
    jb.push(Packet::frame(4, 0, 1, 0x4000));
    assert!(jb.pop_ready().is_some());
    jb.on_keepalive();
    jb.push(Packet::frame(5, 0, 1, 0x4000));
    assert_eq!(jb.pop_ready(), None);
}

#[test]
fn test_downlink_waits_for_keepalive_or_depth() {
    let mut k = server();
    let mut down = Downlink::new();
    k.board_mut().deliver(0, Packet::frame(1, 0, 1, 0x8000).to_bytes());
    down.poll(&mut k);
    assert!(!down.play_next(&mut k));

    k.board_mut().deliver(0, Packet::keepalive(60).to_bytes());
    down.poll(&mut k);
    assert!(down.play_next(&mut k));
    assert_eq!(k.board().tones()[0].duration_ms(), 180);
    assert_eq!(k.board().keyed().len(), 1);
}

#[test]
fn test_client_keying_replays_on_server() {
    // Client keys "N" (dah dit) and flushes after idle
    let mut c = client();
    c.play_symbol(Symbol::Dah, true, &[]);
    c.play_symbol(Symbol::Dit, true, &[]);
    c.board_mut().advance(100);
    c.process_paddles(GpioState::IDLE, true, None);
    let sent = frames(&c);
    assert_eq!(sent.len(), 1);

    let mut s = server();
    let mut down = Downlink::new();
    s.board_mut().deliver(0, Packet::keepalive(60).to_bytes());
    s.board_mut().deliver(0, sent[0].to_bytes());
    down.poll(&mut s);
    // Frame arrived after the keepalive: still waiting for depth or the next keepalive
    assert!(!down.play_next(&mut s));
    s.board_mut().deliver(0, Packet::keepalive(60).to_bytes());
    down.poll(&mut s);
    assert!(down.play_next(&mut s));

    let d: Vec<u64> = s.board().tones().iter().map(|t| t.duration_ms()).collect();
    assert_eq!(d, vec![180, 60]);
    assert_eq!(down.frames_received(), 1);
}
