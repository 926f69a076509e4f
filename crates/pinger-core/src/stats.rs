use crate::Sequence;
use std::net::IpAddr;
use std::time::Duration;

/// The running counters of a session.
///
/// Only the session orchestrator mutates these.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SessionCounters {
    sequence: Sequence,
    probes_sent: usize,
    replies_received: usize,
    rtts: Vec<Duration>,
    ttl_exceeded: usize,
}

impl SessionCounters {
    /// The sequence number to use for the next probe.
    #[must_use]
    pub const fn next_sequence(&self) -> Sequence {
        self.sequence
    }

    /// Record that a probe was accepted by the transport.
    ///
    /// The sequence number wraps to zero after `u16::MAX`, which is the range
    /// available in the echo header.
    pub fn record_sent(&mut self) {
        self.probes_sent += 1;
        self.sequence = Sequence(self.sequence.0.wrapping_add(1));
    }

    /// Record a matched reply.
    pub fn record_reply(&mut self, rtt: Duration, ttl_exceeded: bool) {
        self.replies_received += 1;
        self.rtts.push(rtt);
        if ttl_exceeded {
            self.ttl_exceeded += 1;
        }
    }

    #[must_use]
    pub const fn probes_sent(&self) -> usize {
        self.probes_sent
    }

    #[must_use]
    pub const fn replies_received(&self) -> usize {
        self.replies_received
    }

    #[must_use]
    pub const fn ttl_exceeded(&self) -> usize {
        self.ttl_exceeded
    }

    #[must_use]
    pub fn rtts(&self) -> &[Duration] {
        &self.rtts
    }
}

/// The summary of a completed session.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub destination: IpAddr,
    pub packets_sent: usize,
    pub packets_received: usize,
    pub packets_lost: usize,
    pub ttl_exceeded: usize,
    /// The percentage of probes which received a reply, `None` if no probes were sent.
    pub percent_received: Option<f64>,
    /// The percentage of probes which did not receive a reply, `None` if no probes were sent.
    pub percent_lost: Option<f64>,
    /// The mean round trip time, `None` if no replies were received.
    pub average_rtt: Option<Duration>,
}

impl Statistics {
    #[must_use]
    pub(crate) fn from_counters(destination: IpAddr, counters: &SessionCounters) -> Self {
        let sent = counters.probes_sent();
        let received = counters.replies_received();
        let lost = sent.saturating_sub(received);
        let percent = |value: usize| (sent > 0).then(|| value as f64 / sent as f64 * 100_f64);
        Self {
            destination,
            packets_sent: sent,
            packets_received: received,
            packets_lost: lost,
            ttl_exceeded: counters.ttl_exceeded(),
            percent_received: percent(received),
            percent_lost: percent(lost),
            average_rtt: average(counters.rtts()),
        }
    }

    /// Were any probes sent?
    #[must_use]
    pub const fn has_data(&self) -> bool {
        self.packets_sent > 0
    }
}

fn average(rtts: &[Duration]) -> Option<Duration> {
    let count = u32::try_from(rtts.len()).ok().filter(|count| *count > 0)?;
    Some(rtts.iter().sum::<Duration>() / count)
}
