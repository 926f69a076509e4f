use crate::cancel::CancellationToken;
use crate::codec::{Probe, ProbeCodec};
use crate::constants::{MAX_SEND_BACKOFF, MIN_SEND_BACKOFF};
use crate::error::{Error, ErrorKind, Result};
use crate::net::Network;
use crate::stats::SessionCounters;
use crossbeam::channel::RecvTimeoutError;
use std::time::SystemTime;
use tracing::instrument;

/// Encode and send the next probe.
///
/// A send rejected because the transport has no buffer space is retried, with
/// a bounded exponential backoff, until it is accepted or the session is
/// cancelled.  The counters advance only once the transport accepts the probe.
#[instrument(skip_all, level = "trace")]
pub fn send_one<N: Network>(
    network: &N,
    codec: &ProbeCodec,
    counters: &mut SessionCounters,
    token: &CancellationToken,
) -> Result<()> {
    let probe = Probe::new(counters.next_sequence(), SystemTime::now());
    let packet = codec.encode(&probe)?;
    let mut backoff = MIN_SEND_BACKOFF;
    loop {
        match network.send_probe(&packet) {
            Ok(()) => break,
            Err(Error::IoError(err)) if err.kind() == ErrorKind::NoBufferSpace => {
                tracing::debug!(sequence = probe.sequence.0, ?backoff, "no buffer space, retrying");
                // the cancellation channel never carries a message, any other outcome means cancelled
                if !matches!(
                    token.receiver().recv_timeout(backoff),
                    Err(RecvTimeoutError::Timeout)
                ) {
                    return Err(Error::Cancelled);
                }
                backoff = (backoff * 2).min(MAX_SEND_BACKOFF);
            }
            Err(Error::IoError(err)) => return Err(Error::ProbeFailed(err)),
            Err(err) => return Err(err),
        }
    }
    tracing::trace!(sequence = probe.sequence.0, "sent probe");
    counters.record_sent();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ProbeIdentity;
    use crate::config::IpAddrFamily;
    use crate::error::IoError;
    use crate::net::MockNetwork;
    use crate::{Identifier, PayloadPadding, Sequence, TrackerNonce};
    use std::io;
    use std::net::SocketAddr;
    use std::str::FromStr;
    use std::thread;
    use std::time::Duration;

    fn codec() -> ProbeCodec {
        ProbeCodec::new(
            IpAddrFamily::Ipv4,
            ProbeIdentity {
                identifier: Identifier(7211),
                tracker: TrackerNonce(0x2a3b_4c5d_6e7f_0011),
            },
            PayloadPadding::default(),
        )
    }

    fn no_buffer_space() -> Error {
        let addr = SocketAddr::from_str("1.2.3.4:0").unwrap();
        Error::IoError(IoError::SendTo(io::Error::from(ErrorKind::NoBufferSpace), addr))
    }

    #[test]
    fn test_send_one() -> anyhow::Result<()> {
        let mut network = MockNetwork::new();
        network
            .expect_send_probe()
            .withf(|packet| {
                packet.len() == 24 && packet[0] == 8 && packet[4..8] == [0x1c, 0x2b, 0x00, 0x00]
            })
            .times(1)
            .returning(|_| Ok(()));
        let mut counters = SessionCounters::default();
        send_one(&network, &codec(), &mut counters, &CancellationToken::new())?;
        assert_eq!(1, counters.probes_sent());
        assert_eq!(Sequence(1), counters.next_sequence());
        Ok(())
    }

    #[test]
    fn test_send_one_uses_next_sequence() -> anyhow::Result<()> {
        let mut network = MockNetwork::new();
        let mut seq = mockall::Sequence::new();
        for expected in [0_u8, 1, 2] {
            network
                .expect_send_probe()
                .withf(move |packet| packet[6..8] == [0x00, expected])
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(()));
        }
        let mut counters = SessionCounters::default();
        let token = CancellationToken::new();
        for _ in 0..3 {
            send_one(&network, &codec(), &mut counters, &token)?;
        }
        assert_eq!(3, counters.probes_sent());
        Ok(())
    }

    #[test]
    fn test_retry_on_no_buffer_space() -> anyhow::Result<()> {
        let mut network = MockNetwork::new();
        let mut seq = mockall::Sequence::new();
        network
            .expect_send_probe()
            .times(3)
            .in_sequence(&mut seq)
            .returning(|_| Err(no_buffer_space()));
        network
            .expect_send_probe()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let mut counters = SessionCounters::default();
        send_one(&network, &codec(), &mut counters, &CancellationToken::new())?;
        assert_eq!(1, counters.probes_sent());
        assert_eq!(Sequence(1), counters.next_sequence());
        Ok(())
    }

    #[test]
    fn test_retry_stops_when_cancelled() {
        let mut network = MockNetwork::new();
        network.expect_send_probe().returning(|_| Err(no_buffer_space()));
        let token = CancellationToken::new();
        let canceller = {
            let token = token.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                token.cancel();
            })
        };
        let mut counters = SessionCounters::default();
        let err = send_one(&network, &codec(), &mut counters, &token).unwrap_err();
        canceller.join().unwrap();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(0, counters.probes_sent());
        assert_eq!(Sequence(0), counters.next_sequence());
    }

    #[test]
    fn test_send_failure_is_not_counted() {
        let mut network = MockNetwork::new();
        network.expect_send_probe().times(1).returning(|_| {
            let addr = SocketAddr::from_str("1.2.3.4:0").unwrap();
            Err(Error::IoError(IoError::SendTo(
                io::Error::from(ErrorKind::HostUnreachable),
                addr,
            )))
        });
        let mut counters = SessionCounters::default();
        let err =
            send_one(&network, &codec(), &mut counters, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, Error::ProbeFailed(io) if io.kind() == ErrorKind::HostUnreachable));
        assert_eq!(0, counters.probes_sent());
        assert_eq!(Sequence(0), counters.next_sequence());
    }
}
