//! Desktop board: UDP link, wall clock, keying shown in the log.
//!
//! There are no paddles on a desktop; contacts read open and the selector
//! reads 0. Keying comes from console `send`/`play` or from the network.

use std::time::{Duration, Instant};

use super::udp::UdpLink;
use super::{Clock, Contact, Contacts, Keying, Transport, TransportError};
use crate::log_debug;

/// Sleep per busy-wait iteration.
const RELAX: Duration = Duration::from_micros(200);

pub struct HostBoard {
    link: UdpLink,
    start: Instant,
}

impl HostBoard {
    pub fn new(link: UdpLink) -> Self {
        Self { link, start: Instant::now() }
    }

    pub fn link(&self) -> &UdpLink {
        &self.link
    }
}

impl Contacts for HostBoard {
    fn is_closed(&mut self, _contact: Contact) -> bool {
        false
    }

    fn selector(&mut self) -> u8 {
        0
    }
}

impl Keying for HostBoard {
    fn start_tone(&mut self, hz: u16) {
        log_debug!(self.now_ms(), "tone {} Hz", hz);
    }

    fn stop_tone(&mut self) {}

    fn set_key(&mut self, down: bool) {
        if down {
            log_debug!(self.now_ms(), "key down");
        }
    }

    fn set_status(&mut self, _on: bool) {}
}

impl Clock for HostBoard {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn relax(&mut self) {
        std::thread::sleep(RELAX);
    }
}

impl Transport for HostBoard {
    fn send(&mut self, datagram: &[u8; 8]) -> Result<(), TransportError> {
        self.link.send(datagram)
    }

    fn try_receive(&mut self) -> Option<[u8; 8]> {
        self.link.try_receive()
    }
}
