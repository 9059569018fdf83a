//! Substrate adapter: a thin wrapper over `std::net::UdpSocket`.
//!
//! `set_read_timeout` plus a blocking `recv_from` drives the event loop's
//! readiness wait -- the timeout bound *is* the readiness wait, standing in
//! for a `select()`-style call without pulling in an async runtime.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use crate::error::Result;
use crate::wire::Packet;

/// The outcome of one readiness wait.
pub enum RecvOutcome {
    /// A well-formed packet arrived from `addr`.
    Packet(Packet, SocketAddr),
    /// A datagram arrived but failed to parse; already logged by the caller
    /// of `recv_timeout` is not required -- callers should log and continue
    /// immediately rather than re-wait the full timeout.
    Corrupt,
    /// No datagram arrived before the timeout elapsed.
    TimedOut,
}

/// A bound UDP socket plus the send/receive helpers the engine needs.
pub struct Substrate {
    socket: UdpSocket,
}

impl Substrate {
    /// Bind an ephemeral port on loopback (the receiver's role).
    pub fn bind_ephemeral() -> Result<Self> {
        let socket = UdpSocket::bind(crate::config::RECEIVER_BIND_ADDR)?;
        Ok(Self { socket })
    }

    /// Bind an ephemeral local port with no fixed peer (the sender's role).
    pub fn bind_client() -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        Ok(Self { socket })
    }

    /// The local address this substrate is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Send a packet to a fixed destination (sender's role).
    pub fn send_to(&self, packet: &Packet, dest: impl ToSocketAddrs) -> Result<()> {
        let bytes = packet.encode();
        let dest = dest
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| crate::error::TransportError::InvalidAddr("no address".into()))?;
        let sent = self.socket.send_to(&bytes, dest)?;
        if sent < bytes.len() {
            tracing::warn!("[error] unable to fully send packet");
        }
        Ok(())
    }

    /// Reply to whichever peer address last sent us a datagram (receiver's role).
    pub fn reply_to(&self, packet: &Packet, addr: SocketAddr) -> Result<()> {
        self.send_to(packet, addr)
    }

    /// Wait up to `timeout` for one datagram, parse it, and report the outcome.
    pub fn recv_timeout(&self, timeout: Duration, msg_size: usize) -> Result<RecvOutcome> {
        self.socket.set_read_timeout(Some(timeout))?;
        let mut buf = vec![0u8; msg_size];
        match self.socket.recv_from(&mut buf) {
            Ok((n, addr)) => match Packet::decode(&buf[..n]) {
                Ok(packet) => Ok(RecvOutcome::Packet(packet, addr)),
                Err(_) => Ok(RecvOutcome::Corrupt),
            },
            Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
                Ok(RecvOutcome::TimedOut)
            }
            Err(e) => Err(e.into()),
        }
    }
}
