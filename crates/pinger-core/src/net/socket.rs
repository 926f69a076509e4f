use crate::error::IoResult as Result;
use std::net::SocketAddr;
use std::time::Duration;

/// A raw `ICMP` socket.
///
/// All operations take `&self`; the underlying socket may be written and read
/// from different threads at the same time.
#[cfg_attr(test, mockall::automock)]
pub trait Socket
where
    Self: Sized,
{
    /// Create a raw IPv4 socket for sending and receiving `ICMP` messages.
    fn new_icmp_socket_ipv4() -> Result<Self>;
    /// Create a raw IPv6 socket for sending and receiving `ICMPv6` messages.
    fn new_icmp_socket_ipv6() -> Result<Self>;
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> Result<()>;
    /// Bound the time a subsequent `recv_from` or `recv_msg` may block for.
    fn set_read_timeout(&self, timeout: Duration) -> Result<()>;
    fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, Option<SocketAddr>)>;
    /// Receive a datagram along with the hop limit it arrived with, if reported.
    fn recv_msg(&self, buf: &mut [u8]) -> Result<(usize, Option<SocketAddr>, Option<u8>)>;
}
