//! Packet wire format parsing and building for `ICMP` echo probes.
//!
//! The following packets are supported:
//! - `ICMPv4` and `ICMPv6` echo request and echo reply
//! - `IPv4` headers (read only)
//!
//! # Endianness
//!
//! The internal representation is held in network byte order (big-endian) and
//! all accessor methods take and return data in host byte order, converting as
//! necessary for the given architecture.
//!
//! # Example
//!
//! The following example builds an `ICMPv4` echo request packet:
//!
//! ```rust
//! # fn main() -> anyhow::Result<()> {
//! use pinger_packet::checksum::icmp_ipv4_checksum;
//! use pinger_packet::echo::EchoPacket;
//! use pinger_packet::icmpv4::IcmpType;
//!
//! let mut buf = [0; EchoPacket::minimum_packet_size()];
//! let mut echo = EchoPacket::new(&mut buf)?;
//! echo.set_icmp_type(IcmpType::EchoRequest.id());
//! echo.set_icmp_code(0);
//! echo.set_identifier(7211);
//! echo.set_sequence(3);
//! echo.set_checksum(icmp_ipv4_checksum(echo.packet()));
//! assert_eq!(echo.packet(), &hex_literal::hex!("08 00 db d1 1c 2b 00 03"));
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

mod buffer;

/// Packet errors.
pub mod error;

/// Functions for calculating network checksums.
pub mod checksum;

/// The echo request and echo reply message shared by `ICMPv4` and `ICMPv6`.
pub mod echo;

/// `ICMPv4` message types.
pub mod icmpv4;

/// `ICMPv6` message types.
pub mod icmpv6;

/// `IPv4` packets.
pub mod ipv4;

/// The IP packet next layer protocol.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum IpProtocol {
    Icmp,
    Other(u8),
}

impl From<u8> for IpProtocol {
    fn from(id: u8) -> Self {
        match id {
            1 => Self::Icmp,
            p => Self::Other(p),
        }
    }
}

/// Format a payload as a hexadecimal string.
#[must_use]
pub fn fmt_payload(bytes: &[u8]) -> String {
    use itertools::Itertools as _;
    format!("{:02x}", bytes.iter().format(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(1, IpProtocol::Icmp)]
    #[test_case(58, IpProtocol::Other(58))]
    #[test_case(17, IpProtocol::Other(17))]
    fn test_ip_protocol(id: u8, expected: IpProtocol) {
        assert_eq!(expected, IpProtocol::from(id));
    }

    #[test]
    fn test_fmt_payload() {
        assert_eq!("00 1f ff", fmt_payload(&[0x00, 0x1f, 0xff]));
        assert_eq!("", fmt_payload(&[]));
    }
}
