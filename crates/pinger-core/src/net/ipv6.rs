use crate::constants::MAX_PACKET_SIZE;
use crate::error::{Error, Result};
use crate::net::socket::Socket;
use crate::net::Candidate;
use crate::TimeToLive;
use std::time::SystemTime;
use tracing::instrument;

/// Receive replies from a raw `ICMPv6` socket.
///
/// Raw `ICMPv6` sockets deliver the `ICMPv6` message alone.  The source is
/// taken from the socket address and the hop limit from the `IPV6_HOPLIMIT`
/// ancillary data.
#[derive(Debug)]
pub struct Ipv6;

impl Ipv6 {
    #[instrument(skip(self, socket), level = "trace")]
    pub fn recv_candidate<S: Socket>(&self, socket: &S) -> Result<Option<Candidate>> {
        let mut buf = [0_u8; MAX_PACKET_SIZE];
        match socket.recv_msg(&mut buf) {
            Ok((bytes_read, Some(addr), hop_limit)) => Ok(Some(Candidate {
                bytes: buf[..bytes_read].to_vec(),
                source: addr.ip(),
                ttl: hop_limit.map(TimeToLive),
                received: SystemTime::now(),
            })),
            Ok((_, None, _)) => {
                tracing::debug!("discarding datagram without a source address");
                Ok(None)
            }
            Err(err) if err.is_timeout() => Ok(None),
            Err(err) => Err(Error::IoError(err)),
        }
    }
}
