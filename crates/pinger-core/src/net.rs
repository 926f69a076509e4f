use crate::error::Result;
use crate::TimeToLive;
use std::net::IpAddr;
use std::time::{Duration, SystemTime};

/// IPv4 implementation.
mod ipv4;

/// IPv6 implementation.
mod ipv6;

/// Platform specific network code.
mod platform;

/// A network socket.
mod socket;

/// A channel for sending probes and receiving candidate replies.
pub mod channel;

/// The platform specific socket type.
pub use platform::SocketImpl;

/// A datagram read from the network which may be a reply to one of our probes.
///
/// The `ICMP` message has not yet been decoded or validated.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Candidate {
    /// The raw `ICMP` message, without any IP header.
    pub bytes: Vec<u8>,
    /// The address the datagram was received from.
    pub source: IpAddr,
    /// The ttl or hop limit of the datagram, if known.
    pub ttl: Option<TimeToLive>,
    /// When the datagram was read from the socket.
    pub received: SystemTime,
}

/// An abstraction over a raw `ICMP` endpoint for probing a single target.
///
/// Both methods take `&self` so that one endpoint may be written by the
/// session and read by the reply reader concurrently.
#[cfg_attr(test, mockall::automock)]
pub trait Network {
    /// Send an encoded echo request to the target.
    fn send_probe(&self, packet: &[u8]) -> Result<()>;

    /// Receive the next `ICMP` message, waiting at most `timeout`.
    ///
    /// Returns `None` if the read times out or the datagram read is not a usable `ICMP` message.
    fn recv_candidate(&self, timeout: Duration) -> Result<Option<Candidate>>;
}
