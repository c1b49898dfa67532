//! Non-blocking UDP link shared by the host and ESP boards.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use super::TransportError;
use crate::log_warn;
use crate::logging::last_stamp;
use crate::net::PACKET_LEN;

#[derive(Debug, Default)]
pub struct UdpLink {
    socket: Option<UdpSocket>,
    peer: Option<SocketAddr>,
    /// Reply to whoever spoke last (server role).
    learn_peer: bool,
}

impl UdpLink {
    /// No network.
    pub fn none() -> Self {
        Self::default()
    }

    /// Send to a fixed server.
    pub fn client(server: impl ToSocketAddrs) -> io::Result<Self> {
        let peer = server
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "server address did not resolve"))?;
        let bind: SocketAddr = if peer.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind)?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket: Some(socket), peer: Some(peer), learn_peer: false })
    }

    /// Listen on `port` and answer the most recent sender.
    pub fn server(port: u16) -> io::Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", port))?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket: Some(socket), peer: None, learn_peer: true })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn send(&mut self, datagram: &[u8; PACKET_LEN]) -> Result<(), TransportError> {
        let (Some(socket), Some(peer)) = (self.socket.as_ref(), self.peer) else {
            return Err(TransportError::NotConnected);
        };
        match socket.send_to(datagram, peer) {
            Ok(n) if n == PACKET_LEN => Ok(()),
            _ => Err(TransportError::SendFailed),
        }
    }

    pub fn try_receive(&mut self) -> Option<[u8; PACKET_LEN]> {
        let socket = self.socket.as_ref()?;
        let mut buf = [0u8; 2 * PACKET_LEN];
        loop {
            match socket.recv_from(&mut buf) {
                Ok((PACKET_LEN, from)) => {
                    if self.learn_peer {
                        self.peer = Some(from);
                    }
                    let mut datagram = [0u8; PACKET_LEN];
                    datagram.copy_from_slice(&buf[..PACKET_LEN]);
                    return Some(datagram);
                }
                // Wrong size: not ours
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    if !is_idle(&e) {
                        log_warn!(last_stamp(), "udp: receive failed: {}", e);
                    }
                    return None;
                }
            }
        }
    }
}

/// Nothing waiting on a nonblocking socket.
fn is_idle(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
}
