use crate::constants::MAX_PACKET_SIZE;
use crate::error::{Error, Result};
use crate::net::socket::Socket;
use crate::net::Candidate;
use crate::TimeToLive;
use pinger_packet::ipv4::Ipv4Packet;
use pinger_packet::IpProtocol;
use std::net::IpAddr;
use std::time::SystemTime;
use tracing::instrument;

/// Receive replies from a raw `ICMPv4` socket.
///
/// Datagrams read from a raw `ICMPv4` socket include the `IPv4` header, which
/// is where the ttl and source of the reply are taken from.
#[derive(Debug)]
pub struct Ipv4;

impl Ipv4 {
    #[instrument(skip(self, socket), level = "trace")]
    pub fn recv_candidate<S: Socket>(&self, socket: &S) -> Result<Option<Candidate>> {
        let mut buf = [0_u8; MAX_PACKET_SIZE];
        match socket.recv_from(&mut buf) {
            Ok((bytes_read, _)) => Ok(extract_candidate(&buf[..bytes_read], SystemTime::now())),
            Err(err) if err.is_timeout() => Ok(None),
            Err(err) => Err(Error::IoError(err)),
        }
    }
}

fn extract_candidate(datagram: &[u8], received: SystemTime) -> Option<Candidate> {
    let ipv4 = match Ipv4Packet::new_view(datagram) {
        Ok(ipv4) => ipv4,
        Err(err) => {
            tracing::debug!(%err, "discarding datagram");
            return None;
        }
    };
    if ipv4.get_protocol() != IpProtocol::Icmp {
        tracing::debug!(protocol = ?ipv4.get_protocol(), "discarding non icmp datagram");
        return None;
    }
    Some(Candidate {
        bytes: ipv4.payload().to_vec(),
        source: IpAddr::V4(ipv4.get_source()),
        ttl: Some(TimeToLive(ipv4.get_ttl())),
        received,
    })
}
