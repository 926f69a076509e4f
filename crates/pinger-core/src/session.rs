use crate::cancel::CancellationToken;
use crate::codec::{EchoReply, ProbeCodec, ProbeIdentity};
use crate::config::SessionConfig;
use crate::constants::REPLY_QUEUE_CAPACITY;
use crate::error::{Error, Result};
use crate::net::channel::Channel;
use crate::net::{Candidate, Network, SocketImpl};
use crate::stats::{SessionCounters, Statistics};
use crate::{reader, sender};
use crossbeam::channel::{after, bounded, select, tick, Receiver};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use tracing::instrument;

/// A handler invoked for every matched reply, with whether it exceeded the maximum ttl.
pub type ReplyHandler = Box<dyn FnMut(&EchoReply, bool) + Send>;

/// A handler invoked once with the statistics of the completed session.
pub type CompletionHandler = Box<dyn FnOnce(&Statistics) + Send>;

/// Indicates what triggered the completion of a session.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CompletionReason {
    /// The session was cancelled.
    Cancelled,
    /// The overall deadline expired.
    DeadlineExpired,
    /// The configured number of replies was received.
    TargetReached,
    /// The reply reader failed with a fatal error.
    ReaderFailed,
}

/// An `ICMP` echo probing session for a single target.
///
/// Use the [`crate::Builder`] type to create a [`Session`].
pub struct Session {
    config: SessionConfig,
    identity: ProbeIdentity,
    token: CancellationToken,
    on_reply: Option<ReplyHandler>,
    on_complete: Option<CompletionHandler>,
}

impl Session {
    pub(crate) fn new(
        config: SessionConfig,
        identity: ProbeIdentity,
        token: CancellationToken,
        on_reply: Option<ReplyHandler>,
        on_complete: Option<CompletionHandler>,
    ) -> Self {
        Self {
            config,
            identity,
            token,
            on_reply,
            on_complete,
        }
    }

    /// Run the [`Session`] on the current thread.
    ///
    /// This opens a raw `ICMP` socket for the target and blocks until the
    /// session completes.  Failing to open the socket is returned as an error
    /// without invoking any handler.
    ///
    /// Otherwise the completion handler is invoked exactly once and the final
    /// [`Statistics`] are returned, unless the reply reader failed in which case
    /// its error is returned after the completion handler has been invoked.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// # use std::net::IpAddr;
    /// # use std::str::FromStr;
    /// use pinger_core::Builder;
    ///
    /// let addr = IpAddr::from_str("1.1.1.1")?;
    /// let stats = Builder::new(addr).count(3).build()?.run()?;
    /// println!("{:?}", stats.average_rtt);
    /// # Ok(())
    /// # }
    /// ```
    pub fn run(self) -> Result<Statistics> {
        let channel = Channel::<SocketImpl>::connect(self.config.target_addr)?;
        self.run_with_network(Arc::new(channel))
    }

    /// Spawn the [`Session`] on a new thread.
    ///
    /// Returns the cancellation token of the session and a handle to the
    /// thread, so it may be joined with [`JoinHandle::join`].
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// # use std::net::IpAddr;
    /// # use std::str::FromStr;
    /// # use std::thread;
    /// # use std::time::Duration;
    /// use pinger_core::Builder;
    ///
    /// let addr = IpAddr::from_str("1.1.1.1")?;
    /// let (token, handle) = Builder::new(addr).build()?.spawn()?;
    /// thread::sleep(Duration::from_secs(5));
    /// token.cancel();
    /// let _stats = handle.join().unwrap()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn spawn(self) -> Result<(CancellationToken, JoinHandle<Result<Statistics>>)> {
        let token = self.token.clone();
        let handle = thread::Builder::new()
            .name(format!("pinger-{}", self.identity.identifier.0))
            .spawn(move || self.run())
            .map_err(|err| Error::Other(err.to_string()))?;
        Ok((token, handle))
    }

    /// The cancellation token of the session.
    #[must_use]
    pub fn cancellation(&self) -> CancellationToken {
        self.token.clone()
    }

    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub const fn identity(&self) -> ProbeIdentity {
        self.identity
    }

    /// Run the session over the given network endpoint.
    #[instrument(skip_all, level = "trace")]
    pub(crate) fn run_with_network<N: Network + Send + Sync + 'static>(
        self,
        network: Arc<N>,
    ) -> Result<Statistics> {
        let Self {
            config,
            identity,
            token,
            on_reply,
            on_complete,
        } = self;
        tracing::debug!(?config, ?identity, "starting session");
        let (queue, replies) = bounded(REPLY_QUEUE_CAPACITY);
        let reader = reader::spawn(
            Arc::clone(&network),
            queue,
            token.clone(),
            config.read_timeout,
        )?;
        let orchestrator = Orchestrator {
            network: network.as_ref(),
            codec: ProbeCodec::new(config.addr_family, identity, config.padding.clone()),
            config: &config,
            token: &token,
            counters: SessionCounters::default(),
            on_reply,
        };
        let (reason, counters) = orchestrator.run(&replies);
        token.cancel();
        let reader_result = match reader.join() {
            Ok(result) => result,
            Err(_) => Err(Error::Other(String::from("reply reader panicked"))),
        };
        let reason = if reader_result.is_err() {
            CompletionReason::ReaderFailed
        } else {
            reason
        };
        let stats = Statistics::from_counters(config.target_addr, &counters);
        tracing::debug!(?reason, ?stats, "session complete");
        if let Some(on_complete) = on_complete {
            on_complete(&stats);
        }
        reader_result.map(|()| stats)
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("identity", &self.identity)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// The single writer of the session counters.
struct Orchestrator<'a, N> {
    network: &'a N,
    codec: ProbeCodec,
    config: &'a SessionConfig,
    token: &'a CancellationToken,
    counters: SessionCounters,
    on_reply: Option<ReplyHandler>,
}

impl<N: Network> Orchestrator<'_, N> {
    /// Send probes and process replies until the session completes.
    ///
    /// The first probe is sent immediately and then one per interval, until
    /// the configured count of probes has been sent.  The deadline runs from
    /// before the first send.
    fn run(mut self, replies: &Receiver<Candidate>) -> (CompletionReason, SessionCounters) {
        let reason = self.run_loop(replies);
        (reason, self.counters)
    }

    fn run_loop(&mut self, replies: &Receiver<Candidate>) -> CompletionReason {
        if self.token.is_cancelled() {
            return CompletionReason::Cancelled;
        }
        let deadline = after(self.config.deadline);
        if let Some(reason) = self.send_probe() {
            return reason;
        }
        let cancelled = self.token.receiver().clone();
        let interval = tick(self.config.interval);
        loop {
            select! {
                recv(cancelled) -> _ => return CompletionReason::Cancelled,
                recv(deadline) -> _ => return CompletionReason::DeadlineExpired,
                recv(interval) -> _ => {
                    if !self.config.count.is_reached_by(self.counters.probes_sent()) {
                        if let Some(reason) = self.send_probe() {
                            return reason;
                        }
                    }
                }
                recv(replies) -> candidate => match candidate {
                    Ok(candidate) => self.handle_candidate(&candidate),
                    Err(_) => return CompletionReason::Cancelled,
                },
            }
            if self.config.count.is_reached_by(self.counters.replies_received()) {
                return CompletionReason::TargetReached;
            }
        }
    }

    /// Send the next probe, a failure to send is not fatal.
    fn send_probe(&mut self) -> Option<CompletionReason> {
        match sender::send_one(self.network, &self.codec, &mut self.counters, self.token) {
            Ok(()) => None,
            Err(Error::Cancelled) => Some(CompletionReason::Cancelled),
            Err(err) => {
                tracing::warn!(%err, "failed to send probe");
                None
            }
        }
    }

    /// Decode a candidate and record it if it is a reply to this session.
    fn handle_candidate(&mut self, candidate: &Candidate) {
        match self.codec.decode(candidate) {
            Ok(reply) if self.counters.replies_received() >= self.counters.probes_sent() => {
                tracing::debug!(sequence = reply.sequence.0, "ignoring duplicate reply");
            }
            Ok(reply) => {
                let exceeded = reply
                    .ttl
                    .is_some_and(|ttl| self.config.max_ttl.is_exceeded_by(ttl));
                self.counters.record_reply(reply.rtt, exceeded);
                tracing::debug!(?reply, exceeded, "received reply");
                if let Some(on_reply) = self.on_reply.as_mut() {
                    on_reply(&reply, exceeded);
                }
            }
            Err(err) if err.is_noise() => tracing::trace!(%err, "ignoring icmp message"),
            Err(err) => tracing::warn!(%err, "discarding reply"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, IoError, IoOperation};
    use crate::{Builder, TimeToLive};
    use crossbeam::channel::{unbounded, Sender};
    use parking_lot::Mutex;
    use std::io;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant, SystemTime};

    const TARGET: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

    /// How the fake network answers each probe.
    #[derive(Debug, Clone, Copy)]
    enum Answer {
        Echo(u8),
        Silent,
        ForeignIdentifier,
        Truncated,
        FailReads,
        Duplicate,
        StaleTracker,
        /// Reject the first `n` sends for lack of buffer space, then stay silent.
        Congested(usize),
    }

    /// An in-memory network which answers every request it is sent.
    struct Loopback {
        answer: Answer,
        sent: AtomicUsize,
        rejected: AtomicUsize,
        tx: Sender<Vec<u8>>,
        rx: Receiver<Vec<u8>>,
    }

    impl Loopback {
        fn new(answer: Answer) -> Arc<Self> {
            let (tx, rx) = unbounded();
            Arc::new(Self {
                answer,
                sent: AtomicUsize::new(0),
                rejected: AtomicUsize::new(0),
                tx,
                rx,
            })
        }

        fn sent(&self) -> usize {
            self.sent.load(Ordering::SeqCst)
        }
    }

    impl Network for Loopback {
        fn send_probe(&self, packet: &[u8]) -> Result<()> {
            if let Answer::Congested(n) = self.answer {
                if self.rejected.fetch_add(1, Ordering::SeqCst) < n {
                    let addr = SocketAddr::new(TARGET, 0);
                    return Err(Error::IoError(IoError::SendTo(
                        io::Error::from(ErrorKind::NoBufferSpace),
                        addr,
                    )));
                }
            }
            self.sent.fetch_add(1, Ordering::SeqCst);
            let mut reply = packet.to_vec();
            reply[0] = 0;
            match self.answer {
                Answer::Echo(_) | Answer::FailReads => {}
                Answer::Silent | Answer::Congested(_) => return Ok(()),
                Answer::ForeignIdentifier => reply[4] ^= 0xff,
                Answer::Truncated => reply.truncate(10),
                Answer::StaleTracker => reply[16] ^= 0xff,
                Answer::Duplicate => self
                    .tx
                    .send(reply.clone())
                    .map_err(|err| Error::Other(err.to_string()))?,
            }
            self.tx
                .send(reply)
                .map_err(|err| Error::Other(err.to_string()))
        }

        fn recv_candidate(&self, timeout: Duration) -> Result<Option<Candidate>> {
            if let Answer::FailReads = self.answer {
                return Err(Error::IoError(IoError::Other(
                    io::Error::from(io::ErrorKind::PermissionDenied),
                    IoOperation::RecvFrom,
                )));
            }
            let ttl = match self.answer {
                Answer::Echo(ttl) => Some(TimeToLive(ttl)),
                _ => Some(TimeToLive(64)),
            };
            Ok(self.rx.recv_timeout(timeout).ok().map(|bytes| Candidate {
                bytes,
                source: TARGET,
                ttl,
                received: SystemTime::now(),
            }))
        }
    }

    fn builder() -> Builder {
        Builder::new(TARGET)
            .interval(Duration::from_millis(10))
            .read_timeout(Duration::from_millis(10))
            .identifier(7211)
            .tracker(0x2a3b_4c5d_6e7f_0011)
    }

    #[test]
    fn test_count_reached() -> anyhow::Result<()> {
        let network = Loopback::new(Answer::Echo(64));
        let completed = Arc::new(AtomicUsize::new(0));
        let on_complete = Arc::clone(&completed);
        let replies = Arc::new(Mutex::new(vec![]));
        let on_reply = Arc::clone(&replies);
        let stats = builder()
            .count(5)
            .on_reply(move |reply, exceeded| on_reply.lock().push((reply.sequence.0, exceeded)))
            .on_complete(move |_| {
                on_complete.fetch_add(1, Ordering::SeqCst);
            })
            .build()?
            .run_with_network(Arc::clone(&network))?;
        assert_eq!(5, network.sent());
        assert_eq!(5, stats.packets_sent);
        assert_eq!(5, stats.packets_received);
        assert_eq!(0, stats.packets_lost);
        assert_eq!(Some(100_f64), stats.percent_received);
        assert!(stats.average_rtt.is_some());
        assert_eq!(1, completed.load(Ordering::SeqCst));
        assert_eq!(
            vec![(0, false), (1, false), (2, false), (3, false), (4, false)],
            *replies.lock()
        );
        Ok(())
    }

    #[test]
    fn test_deadline_expired_without_replies() -> anyhow::Result<()> {
        let network = Loopback::new(Answer::Silent);
        let start = Instant::now();
        let stats = builder()
            .interval(Duration::from_millis(50))
            .deadline(Duration::from_millis(200))
            .build()?
            .run_with_network(Arc::clone(&network))?;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_secs(2));
        assert!((2..=5).contains(&stats.packets_sent));
        assert_eq!(network.sent(), stats.packets_sent);
        assert_eq!(0, stats.packets_received);
        assert_eq!(stats.packets_sent, stats.packets_lost);
        assert_eq!(Some(0_f64), stats.percent_received);
        assert_eq!(Some(100_f64), stats.percent_lost);
        assert_eq!(None, stats.average_rtt);
        Ok(())
    }

    #[test]
    fn test_ttl_exceeded() -> anyhow::Result<()> {
        let network = Loopback::new(Answer::Echo(128));
        let flags = Arc::new(Mutex::new(vec![]));
        let on_reply = Arc::clone(&flags);
        let stats = builder()
            .count(2)
            .max_ttl(64)
            .on_reply(move |_, exceeded| on_reply.lock().push(exceeded))
            .build()?
            .run_with_network(network)?;
        assert_eq!(2, stats.ttl_exceeded);
        assert_eq!(vec![true, true], *flags.lock());
        Ok(())
    }

    #[test]
    fn test_ttl_at_maximum_not_exceeded() -> anyhow::Result<()> {
        let network = Loopback::new(Answer::Echo(64));
        let stats = builder()
            .count(2)
            .max_ttl(64)
            .build()?
            .run_with_network(network)?;
        assert_eq!(2, stats.packets_received);
        assert_eq!(0, stats.ttl_exceeded);
        Ok(())
    }

    #[test]
    fn test_foreign_replies_ignored() -> anyhow::Result<()> {
        let network = Loopback::new(Answer::ForeignIdentifier);
        let replies = Arc::new(AtomicUsize::new(0));
        let on_reply = Arc::clone(&replies);
        let stats = builder()
            .count(3)
            .deadline(Duration::from_millis(150))
            .on_reply(move |_, _| {
                on_reply.fetch_add(1, Ordering::SeqCst);
            })
            .build()?
            .run_with_network(network)?;
        assert_eq!(3, stats.packets_sent);
        assert_eq!(0, stats.packets_received);
        assert_eq!(0, replies.load(Ordering::SeqCst));
        Ok(())
    }

    #[test]
    fn test_duplicate_reply_ignored() -> anyhow::Result<()> {
        let network = Loopback::new(Answer::Duplicate);
        let replies = Arc::new(AtomicUsize::new(0));
        let on_reply = Arc::clone(&replies);
        let stats = builder()
            .interval(Duration::from_secs(5))
            .deadline(Duration::from_millis(100))
            .on_reply(move |_, _| {
                on_reply.fetch_add(1, Ordering::SeqCst);
            })
            .build()?
            .run_with_network(network)?;
        assert_eq!(1, stats.packets_sent);
        assert_eq!(1, stats.packets_received);
        assert_eq!(1, replies.load(Ordering::SeqCst));
        Ok(())
    }

    #[test]
    fn test_duplicate_replies_never_exceed_sent() -> anyhow::Result<()> {
        let network = Loopback::new(Answer::Duplicate);
        let replies = Arc::new(AtomicUsize::new(0));
        let on_reply = Arc::clone(&replies);
        let stats = builder()
            .count(0)
            .deadline(Duration::from_millis(100))
            .on_reply(move |_, _| {
                on_reply.fetch_add(1, Ordering::SeqCst);
            })
            .build()?
            .run_with_network(network)?;
        assert!(stats.packets_received > 0);
        assert!(stats.packets_received <= stats.packets_sent);
        assert_eq!(stats.packets_received, replies.load(Ordering::SeqCst));
        Ok(())
    }

    #[test]
    fn test_stale_tracker_ignored() -> anyhow::Result<()> {
        let network = Loopback::new(Answer::StaleTracker);
        let replies = Arc::new(AtomicUsize::new(0));
        let on_reply = Arc::clone(&replies);
        let stats = builder()
            .count(3)
            .deadline(Duration::from_millis(150))
            .on_reply(move |_, _| {
                on_reply.fetch_add(1, Ordering::SeqCst);
            })
            .build()?
            .run_with_network(network)?;
        assert_eq!(3, stats.packets_sent);
        assert_eq!(0, stats.packets_received);
        assert_eq!(0, replies.load(Ordering::SeqCst));
        Ok(())
    }

    #[test]
    fn test_deadline_includes_delayed_first_send() -> anyhow::Result<()> {
        // backs off for 1+2+4+8+16+32+64+100ms before the first send is accepted
        let network = Loopback::new(Answer::Congested(8));
        let start = Instant::now();
        let stats = builder()
            .interval(Duration::from_secs(5))
            .deadline(Duration::from_millis(150))
            .build()?
            .run_with_network(Arc::clone(&network))?;
        let elapsed = start.elapsed();
        assert_eq!(1, stats.packets_sent);
        assert_eq!(1, network.sent());
        assert!(elapsed >= Duration::from_millis(227));
        assert!(elapsed < Duration::from_millis(350));
        Ok(())
    }

    #[test]
    fn test_malformed_replies_not_counted() -> anyhow::Result<()> {
        let network = Loopback::new(Answer::Truncated);
        let stats = builder()
            .deadline(Duration::from_millis(100))
            .build()?
            .run_with_network(network)?;
        assert!(stats.packets_sent > 0);
        assert_eq!(0, stats.packets_received);
        Ok(())
    }

    #[test]
    fn test_external_cancellation() -> anyhow::Result<()> {
        let network = Loopback::new(Answer::Silent);
        let completed = Arc::new(AtomicUsize::new(0));
        let on_complete = Arc::clone(&completed);
        let session = builder()
            .on_complete(move |_| {
                on_complete.fetch_add(1, Ordering::SeqCst);
            })
            .build()?;
        let token = session.cancellation();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            token.cancel();
            token.cancel();
        });
        let stats = session.run_with_network(network)?;
        canceller.join().unwrap();
        assert!(stats.packets_sent >= 1);
        assert_eq!(0, stats.packets_received);
        assert_eq!(1, completed.load(Ordering::SeqCst));
        Ok(())
    }

    #[test]
    fn test_cancelled_before_run() -> anyhow::Result<()> {
        let network = Loopback::new(Answer::Echo(64));
        let session = builder().build()?;
        session.cancellation().cancel();
        let stats = session.run_with_network(Arc::clone(&network))?;
        assert_eq!(0, network.sent());
        assert!(!stats.has_data());
        assert_eq!(None, stats.percent_lost);
        Ok(())
    }

    #[test]
    fn test_reader_failure_reports_statistics() -> anyhow::Result<()> {
        let network = Loopback::new(Answer::FailReads);
        let completed = Arc::new(Mutex::new(None));
        let on_complete = Arc::clone(&completed);
        let err = builder()
            .on_complete(move |stats| *on_complete.lock() = Some(stats.clone()))
            .build()?
            .run_with_network(network)
            .unwrap_err();
        assert!(matches!(err, Error::IoError(IoError::Other(_, IoOperation::RecvFrom))));
        let stats = completed.lock().take().unwrap();
        assert_eq!(TARGET, stats.destination);
        assert_eq!(0, stats.packets_received);
        Ok(())
    }
}
