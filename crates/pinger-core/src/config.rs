use crate::{MaxTtl, PayloadPadding, ReplyCount};
use std::fmt::{Display, Formatter};
use std::net::IpAddr;
use std::time::Duration;

/// Default values for configuration.
pub mod defaults {
    use std::time::Duration;

    /// The default value for `count`, zero means unbounded.
    pub const DEFAULT_COUNT: usize = 0;

    /// The default value for `interval`.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    /// The default value for `read-timeout`.
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

    /// The default value for `deadline`.
    pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(100_000);

    /// The default value for `max-ttl`.
    pub const DEFAULT_MAX_TTL: u16 = 255;

    /// The default value for `padding`, expressed as binary digits.
    pub const DEFAULT_PADDING: &str = "00000000";
}

/// The address family.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IpAddrFamily {
    /// Internet Protocol V4
    Ipv4,
    /// Internet Protocol V6
    Ipv6,
}

impl From<IpAddr> for IpAddrFamily {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Self::Ipv4,
            IpAddr::V6(_) => Self::Ipv6,
        }
    }
}

impl Display for IpAddrFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ipv4 => write!(f, "ipv4"),
            Self::Ipv6 => write!(f, "ipv6"),
        }
    }
}

/// The immutable configuration of a probing session.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SessionConfig {
    pub target_addr: IpAddr,
    pub addr_family: IpAddrFamily,
    pub count: ReplyCount,
    pub interval: Duration,
    pub read_timeout: Duration,
    pub deadline: Duration,
    pub max_ttl: MaxTtl,
    pub padding: PayloadPadding,
}

impl SessionConfig {
    #[must_use]
    pub fn new(
        target_addr: IpAddr,
        count: ReplyCount,
        interval: Duration,
        read_timeout: Duration,
        deadline: Duration,
        max_ttl: MaxTtl,
        padding: PayloadPadding,
    ) -> Self {
        Self {
            target_addr,
            addr_family: IpAddrFamily::from(target_addr),
            count,
            interval,
            read_timeout,
            deadline,
            max_ttl,
            padding,
        }
    }
}
