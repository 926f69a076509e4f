/// The type of `ICMPv4` packet.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub enum IcmpType {
    EchoReply,
    DestinationUnreachable,
    EchoRequest,
    TimeExceeded,
    Other(u8),
}

impl IcmpType {
    #[must_use]
    pub const fn id(&self) -> u8 {
        match self {
            Self::EchoReply => 0,
            Self::DestinationUnreachable => 3,
            Self::EchoRequest => 8,
            Self::TimeExceeded => 11,
            Self::Other(id) => *id,
        }
    }
}

impl From<u8> for IcmpType {
    fn from(val: u8) -> Self {
        match val {
            0 => Self::EchoReply,
            3 => Self::DestinationUnreachable,
            8 => Self::EchoRequest,
            11 => Self::TimeExceeded,
            id => Self::Other(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, IcmpType::EchoReply)]
    #[test_case(3, IcmpType::DestinationUnreachable)]
    #[test_case(8, IcmpType::EchoRequest)]
    #[test_case(11, IcmpType::TimeExceeded)]
    #[test_case(129, IcmpType::Other(129))]
    fn test_icmp_type(id: u8, expected: IcmpType) {
        assert_eq!(expected, IcmpType::from(id));
        assert_eq!(id, expected.id());
    }
}
