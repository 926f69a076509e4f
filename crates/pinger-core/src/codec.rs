use crate::config::IpAddrFamily;
use crate::constants::PAYLOAD_HEADER_SIZE;
use crate::error::Result;
use crate::net::Candidate;
use crate::{Identifier, PayloadPadding, Sequence, TimeToLive, TrackerNonce};
use pinger_packet::checksum::icmp_ipv4_checksum;
use pinger_packet::echo::EchoPacket;
use pinger_packet::{icmpv4, icmpv6};
use std::net::IpAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// The identity shared by every probe of a session.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ProbeIdentity {
    pub identifier: Identifier,
    pub tracker: TrackerNonce,
}

/// An outgoing echo request.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Probe {
    pub sequence: Sequence,
    pub sent: SystemTime,
}

impl Probe {
    #[must_use]
    pub const fn new(sequence: Sequence, sent: SystemTime) -> Self {
        Self { sequence, sent }
    }
}

/// An echo reply which matched a probe sent by this session.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EchoReply {
    /// The address the reply was received from.
    pub source: IpAddr,
    pub sequence: Sequence,
    /// The round trip time, receive time minus the send time carried in the payload.
    pub rtt: Duration,
    /// The observed ttl (`IPv4`) or hop limit (`IPv6`), if the transport reported it.
    pub ttl: Option<TimeToLive>,
    /// The length of the `ICMP` message in bytes.
    pub bytes: usize,
}

/// The reason a received `ICMP` message was not accepted as a reply.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum DecodeError {
    #[error("not an echo reply: icmp type {0}")]
    NotAnEchoReply(u8),
    #[error("echo reply for identifier {0} is not for this session")]
    IdentifierMismatch(u16),
    #[error("malformed echo reply: {0} bytes, expected at least {1}")]
    Malformed(usize, usize),
    #[error("echo reply with tracker {0:#x} is not for this session")]
    TrackerMismatch(u64),
}

impl DecodeError {
    /// Is this expected traffic on a shared raw socket which should be dropped silently?
    #[must_use]
    pub const fn is_noise(&self) -> bool {
        !matches!(self, Self::Malformed(..))
    }
}

/// Encode echo requests and decode echo replies for one address family.
#[derive(Debug, Clone)]
pub struct ProbeCodec {
    family: IpAddrFamily,
    identity: ProbeIdentity,
    padding: PayloadPadding,
}

impl ProbeCodec {
    #[must_use]
    pub const fn new(family: IpAddrFamily, identity: ProbeIdentity, padding: PayloadPadding) -> Self {
        Self {
            family,
            identity,
            padding,
        }
    }

    /// Build the echo request for a `Probe`.
    ///
    /// The payload is the send time as big-endian nanoseconds since the unix
    /// epoch, followed by the big-endian tracker nonce and then the padding.
    pub fn encode(&self, probe: &Probe) -> Result<Vec<u8>> {
        let mut buf =
            vec![0_u8; EchoPacket::minimum_packet_size() + PAYLOAD_HEADER_SIZE + self.padding.len()];
        let mut echo = EchoPacket::new(&mut buf)?;
        echo.set_icmp_type(self.echo_request_type());
        echo.set_icmp_code(0);
        echo.set_identifier(self.identity.identifier.0);
        echo.set_sequence(probe.sequence.0);
        echo.set_payload(&self.payload(probe.sent))?;
        // the kernel computes the ICMPv6 checksum for raw sockets
        if self.family == IpAddrFamily::Ipv4 {
            echo.set_checksum(icmp_ipv4_checksum(echo.packet()));
        }
        Ok(buf)
    }

    /// Validate a received `ICMP` message and extract the reply it carries.
    pub fn decode(&self, candidate: &Candidate) -> std::result::Result<EchoReply, DecodeError> {
        let len = candidate.bytes.len();
        let echo = EchoPacket::new_view(&candidate.bytes)
            .map_err(|_| DecodeError::Malformed(len, EchoPacket::minimum_packet_size()))?;
        if echo.get_icmp_type() != self.echo_reply_type() {
            return Err(DecodeError::NotAnEchoReply(echo.get_icmp_type()));
        }
        if echo.get_identifier() != self.identity.identifier.0 {
            return Err(DecodeError::IdentifierMismatch(echo.get_identifier()));
        }
        let payload = echo.payload();
        let (Some(nanos), Some(tracker)) = (read_u64(payload, 0), read_u64(payload, 8)) else {
            return Err(DecodeError::Malformed(
                len,
                EchoPacket::minimum_packet_size() + PAYLOAD_HEADER_SIZE,
            ));
        };
        if tracker != self.identity.tracker.0 {
            return Err(DecodeError::TrackerMismatch(tracker));
        }
        let sent = UNIX_EPOCH + Duration::from_nanos(nanos);
        Ok(EchoReply {
            source: candidate.source,
            sequence: Sequence(echo.get_sequence()),
            rtt: candidate.received.duration_since(sent).unwrap_or_default(),
            ttl: candidate.ttl,
            bytes: len,
        })
    }

    fn payload(&self, sent: SystemTime) -> Vec<u8> {
        let nanos = sent
            .duration_since(UNIX_EPOCH)
            .map_or(0, |since| since.as_nanos() as u64);
        let mut payload = Vec::with_capacity(PAYLOAD_HEADER_SIZE + self.padding.len());
        payload.extend_from_slice(&nanos.to_be_bytes());
        payload.extend_from_slice(&self.identity.tracker.0.to_be_bytes());
        payload.extend_from_slice(&self.padding.0);
        payload
    }

    const fn echo_request_type(&self) -> u8 {
        match self.family {
            IpAddrFamily::Ipv4 => icmpv4::IcmpType::EchoRequest.id(),
            IpAddrFamily::Ipv6 => icmpv6::IcmpType::EchoRequest.id(),
        }
    }

    const fn echo_reply_type(&self) -> u8 {
        match self.family {
            IpAddrFamily::Ipv4 => icmpv4::IcmpType::EchoReply.id(),
            IpAddrFamily::Ipv6 => icmpv6::IcmpType::EchoReply.id(),
        }
    }
}

fn read_u64(bytes: &[u8], offset: usize) -> Option<u64> {
    bytes
        .get(offset..offset + 8)
        .and_then(|word| <[u8; 8]>::try_from(word).ok())
        .map(u64::from_be_bytes)
}
