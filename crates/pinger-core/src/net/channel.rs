use crate::error::{Error, Result};
use crate::net::socket::Socket;
use crate::net::{ipv4::Ipv4, ipv6::Ipv6, Candidate, Network};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::instrument;

/// A channel for sending echo requests to, and receiving replies from, a single target.
pub struct Channel<S: Socket> {
    socket: S,
    target: SocketAddr,
    family_config: FamilyConfig,
}

/// The IP family configuration for the channel.
enum FamilyConfig {
    V4(Ipv4),
    V6(Ipv6),
}

impl<S: Socket> Channel<S> {
    /// Open a raw `ICMP` socket for the address family of `target_addr`.
    ///
    /// This operation requires the `CAP_NET_RAW` capability on Linux.
    #[instrument(level = "trace")]
    pub fn connect(target_addr: IpAddr) -> Result<Self> {
        let (socket, family_config) = match target_addr {
            IpAddr::V4(_) => (S::new_icmp_socket_ipv4()?, FamilyConfig::V4(Ipv4)),
            IpAddr::V6(_) => (S::new_icmp_socket_ipv6()?, FamilyConfig::V6(Ipv6)),
        };
        tracing::debug!(%target_addr, "opened raw icmp socket");
        Ok(Self {
            socket,
            target: SocketAddr::new(target_addr, 0),
            family_config,
        })
    }
}

impl<S: Socket> Network for Channel<S> {
    #[instrument(skip(self, packet), level = "trace")]
    fn send_probe(&self, packet: &[u8]) -> Result<()> {
        self.socket
            .send_to(packet, self.target)
            .map_err(Error::IoError)
    }

    #[instrument(skip(self), level = "trace")]
    fn recv_candidate(&self, timeout: Duration) -> Result<Option<Candidate>> {
        self.socket.set_read_timeout(timeout)?;
        match &self.family_config {
            FamilyConfig::V4(ipv4) => ipv4.recv_candidate(&self.socket),
            FamilyConfig::V6(ipv6) => ipv6.recv_candidate(&self.socket),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, IoError, IoOperation, IoResult};
    use crate::mocket_recv_msg;
    use crate::net::socket::MockSocket;
    use crate::TimeToLive;
    use hex_literal::hex;
    use mockall::predicate;
    use std::io;
    use std::str::FromStr;
    use std::sync::Mutex;

    // serialise tests which set expectations on the static socket constructors
    static MTX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_connect_ipv4() -> anyhow::Result<()> {
        let _m = MTX.lock();
        let ctx = MockSocket::new_icmp_socket_ipv4_context();
        ctx.expect().times(1).returning(|| Ok(MockSocket::new()));
        let channel = Channel::<MockSocket>::connect(IpAddr::from_str("1.2.3.4")?)?;
        assert_eq!(SocketAddr::from_str("1.2.3.4:0")?, channel.target);
        assert!(matches!(channel.family_config, FamilyConfig::V4(_)));
        Ok(())
    }

    #[test]
    fn test_connect_ipv6_failure() -> anyhow::Result<()> {
        let _m = MTX.lock();
        let ctx = MockSocket::new_icmp_socket_ipv6_context();
        ctx.expect().times(1).returning(|| {
            Err(IoError::Other(
                io::Error::from(io::ErrorKind::PermissionDenied),
                IoOperation::NewSocket,
            ))
        });
        let err = Channel::<MockSocket>::connect(IpAddr::from_str("::1")?)
            .err()
            .unwrap();
        assert!(matches!(err, Error::IoError(IoError::Other(_, IoOperation::NewSocket))));
        Ok(())
    }

    #[test]
    fn test_send_probe() -> anyhow::Result<()> {
        let target = SocketAddr::from_str("1.2.3.4:0")?;
        let packet = hex!("08 00 db d1 1c 2b 00 03");
        let mut mocket = MockSocket::new();
        mocket
            .expect_send_to()
            .with(predicate::eq(packet), predicate::eq(target))
            .times(1)
            .returning(|_, _| Ok(()));
        let channel = Channel {
            socket: mocket,
            target,
            family_config: FamilyConfig::V4(Ipv4),
        };
        channel.send_probe(&packet)?;
        Ok(())
    }

    #[test]
    fn test_send_probe_no_buffer_space() -> anyhow::Result<()> {
        let target = SocketAddr::from_str("1.2.3.4:0")?;
        let mut mocket = MockSocket::new();
        mocket
            .expect_send_to()
            .times(1)
            .returning(|_, addr| Err(IoError::SendTo(io::Error::from(ErrorKind::NoBufferSpace), addr)));
        let channel = Channel {
            socket: mocket,
            target,
            family_config: FamilyConfig::V4(Ipv4),
        };
        let err = channel.send_probe(&[0; 8]).unwrap_err();
        assert!(matches!(err, Error::IoError(io) if io.kind() == ErrorKind::NoBufferSpace));
        Ok(())
    }

    #[test]
    fn test_recv_candidate_sets_read_timeout() -> anyhow::Result<()> {
        let addr = SocketAddr::from_str("[::1]:0")?;
        let read_buf = hex!("81 00 00 00 1c 2b 00 03");
        let mut mocket = MockSocket::new();
        let mut seq = mockall::Sequence::new();
        mocket
            .expect_set_read_timeout()
            .with(predicate::eq(Duration::from_millis(250)))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mocket
            .expect_recv_msg()
            .times(1)
            .in_sequence(&mut seq)
            .returning(mocket_recv_msg!(read_buf, addr, Some(64)));
        let channel = Channel {
            socket: mocket,
            target: addr,
            family_config: FamilyConfig::V6(Ipv6),
        };
        let candidate = channel.recv_candidate(Duration::from_millis(250))?.unwrap();
        assert_eq!(addr.ip(), candidate.source);
        assert_eq!(Some(TimeToLive(64)), candidate.ttl);
        assert_eq!(read_buf, candidate.bytes[..]);
        Ok(())
    }
}
