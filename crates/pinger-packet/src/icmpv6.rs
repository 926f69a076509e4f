/// The type of `ICMPv6` packet.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub enum IcmpType {
    DestinationUnreachable,
    TimeExceeded,
    EchoRequest,
    EchoReply,
    Other(u8),
}

impl IcmpType {
    #[must_use]
    pub const fn id(&self) -> u8 {
        match self {
            Self::DestinationUnreachable => 1,
            Self::TimeExceeded => 3,
            Self::EchoRequest => 128,
            Self::EchoReply => 129,
            Self::Other(id) => *id,
        }
    }
}

impl From<u8> for IcmpType {
    fn from(val: u8) -> Self {
        match val {
            1 => Self::DestinationUnreachable,
            3 => Self::TimeExceeded,
            128 => Self::EchoRequest,
            129 => Self::EchoReply,
            id => Self::Other(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(1, IcmpType::DestinationUnreachable)]
    #[test_case(3, IcmpType::TimeExceeded)]
    #[test_case(128, IcmpType::EchoRequest)]
    #[test_case(129, IcmpType::EchoReply)]
    #[test_case(0, IcmpType::Other(0))]
    fn test_icmp_type(id: u8, expected: IcmpType) {
        assert_eq!(expected, IcmpType::from(id));
        assert_eq!(id, expected.id());
    }
}
