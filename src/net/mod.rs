//! UDP relay between a keying client and a sounding server.
//!
//! The client frames live iambic keying (see [`framer`], [`client`]); the
//! server buffers frames (see [`jitter`]) and replays them with the sender's
//! gaps (see [`server`]). Packets are described in [`packet`].

pub mod client;
pub mod framer;
pub mod jitter;
pub mod packet;
pub mod server;

pub use client::Uplink;
pub use packet::{Packet, PacketError, PacketKind, PACKET_LEN};
pub use server::Downlink;

use crate::config::SettingsStore;
use crate::control::Control;
use crate::hal::{Board, ByteStore};
use crate::keyer::Keyer;
use crate::logging;

/// Network role, chosen once at boot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Role {
    /// Local keyer only.
    #[default]
    Disconnected,
    Client,
    Server,
}

impl Role {
    /// Role from the memory selector position at boot: 1 client, 2 server.
    pub fn from_selector(position: u8) -> Self {
        match position {
            1 => Role::Client,
            2 => Role::Server,
            _ => Role::Disconnected,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "local" | "standalone" => Some(Role::Disconnected),
            "client" => Some(Role::Client),
            "server" => Some(Role::Server),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Disconnected => "local",
            Role::Client => "client",
            Role::Server => "server",
        }
    }

    /// Letter keyed at boot to confirm the role.
    pub fn announce_char(self) -> char {
        match self {
            Role::Disconnected => 'R',
            Role::Client => 'C',
            Role::Server => 'S',
        }
    }
}

/// Role-specific loop state.
#[derive(Debug)]
pub enum Station {
    Local,
    /// The uplink itself lives in the keyer.
    Client,
    Server(Downlink),
}

impl Station {
    pub fn new(role: Role) -> Self {
        match role {
            Role::Disconnected => Station::Local,
            Role::Client => Station::Client,
            Role::Server => Station::Server(Downlink::new()),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Station::Local => Role::Disconnected,
            Station::Client => Role::Client,
            Station::Server(_) => Role::Server,
        }
    }

    /// One main loop iteration.
    ///
    /// The server only relays; local and client stations run the paddles
    /// and the control state machine. The client also collects ACKs and
    /// sends keepalives while the control machine is idle.
    pub fn tick<B: Board, S: ByteStore>(
        &mut self,
        keyer: &mut Keyer<B>,
        control: &mut Control,
        store: &mut SettingsStore<S>,
    ) {
        logging::stamp(keyer.now_ms());
        let paddles = keyer.sample();

        match self {
            Station::Server(downlink) => {
                downlink.poll(keyer);
                downlink.play_next(keyer);
            }
            Station::Client => {
                if control.is_idle() {
                    keyer.service_uplink(paddles);
                }
                control.tick(keyer, store, paddles);
            }
            Station::Local => control.tick(keyer, store, paddles),
        }
    }
}
