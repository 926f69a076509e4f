use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::fmt_payload;
use std::fmt::{Debug, Formatter};

const TYPE_OFFSET: usize = 0;
const CODE_OFFSET: usize = 1;
const CHECKSUM_OFFSET: usize = 2;
const IDENTIFIER_OFFSET: usize = 4;
const SEQUENCE_OFFSET: usize = 6;

/// Represents an `ICMP` echo request or echo reply packet.
///
/// `ICMPv4` and `ICMPv6` share the same layout for echo messages and differ
/// only in the type values used, see [`crate::icmpv4::IcmpType`] and
/// [`crate::icmpv6::IcmpType`].
///
/// The internal representation is held in network byte order (big-endian) and all accessor methods
/// take and return data in host byte order, converting as necessary for the given architecture.
pub struct EchoPacket<'a> {
    buf: Buffer<'a>,
}

impl<'a> EchoPacket<'a> {
    pub fn new(packet: &'a mut [u8]) -> Result<Self> {
        if packet.len() >= Self::minimum_packet_size() {
            Ok(Self {
                buf: Buffer::Mutable(packet),
            })
        } else {
            Err(Error::InsufficientPacketBuffer(
                String::from("EchoPacket"),
                Self::minimum_packet_size(),
                packet.len(),
            ))
        }
    }

    pub fn new_view(packet: &'a [u8]) -> Result<Self> {
        if packet.len() >= Self::minimum_packet_size() {
            Ok(Self {
                buf: Buffer::Immutable(packet),
            })
        } else {
            Err(Error::InsufficientPacketBuffer(
                String::from("EchoPacket"),
                Self::minimum_packet_size(),
                packet.len(),
            ))
        }
    }

    #[must_use]
    pub const fn minimum_packet_size() -> usize {
        8
    }

    #[must_use]
    pub fn get_icmp_type(&self) -> u8 {
        self.buf.read(TYPE_OFFSET)
    }

    #[must_use]
    pub fn get_icmp_code(&self) -> u8 {
        self.buf.read(CODE_OFFSET)
    }

    #[must_use]
    pub fn get_checksum(&self) -> u16 {
        u16::from_be_bytes(self.buf.get_bytes(CHECKSUM_OFFSET))
    }

    #[must_use]
    pub fn get_identifier(&self) -> u16 {
        u16::from_be_bytes(self.buf.get_bytes(IDENTIFIER_OFFSET))
    }

    #[must_use]
    pub fn get_sequence(&self) -> u16 {
        u16::from_be_bytes(self.buf.get_bytes(SEQUENCE_OFFSET))
    }

    pub fn set_icmp_type(&mut self, val: u8) {
        *self.buf.write(TYPE_OFFSET) = val;
    }

    pub fn set_icmp_code(&mut self, val: u8) {
        *self.buf.write(CODE_OFFSET) = val;
    }

    pub fn set_checksum(&mut self, val: u16) {
        self.buf.set_bytes(CHECKSUM_OFFSET, val.to_be_bytes());
    }

    pub fn set_identifier(&mut self, val: u16) {
        self.buf.set_bytes(IDENTIFIER_OFFSET, val.to_be_bytes());
    }

    pub fn set_sequence(&mut self, val: u16) {
        self.buf.set_bytes(SEQUENCE_OFFSET, val.to_be_bytes());
    }

    /// Copy `vals` into the packet immediately after the echo header.
    pub fn set_payload(&mut self, vals: &[u8]) -> Result<()> {
        let offset = Self::minimum_packet_size();
        let capacity = self.buf.len() - offset;
        if vals.len() > capacity {
            return Err(Error::PayloadTooLarge(
                vals.len(),
                String::from("EchoPacket"),
                capacity,
            ));
        }
        self.buf.as_slice_mut()[offset..offset + vals.len()].copy_from_slice(vals);
        Ok(())
    }

    #[must_use]
    pub fn packet(&self) -> &[u8] {
        self.buf.as_slice()
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.buf.as_slice()[Self::minimum_packet_size()..]
    }
}

impl Debug for EchoPacket<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EchoPacket")
            .field("icmp_type", &self.get_icmp_type())
            .field("icmp_code", &self.get_icmp_code())
            .field("checksum", &self.get_checksum())
            .field("identifier", &self.get_identifier())
            .field("sequence", &self.get_sequence())
            .field("payload", &fmt_payload(self.payload()))
            .finish()
    }
}
