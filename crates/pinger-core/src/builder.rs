use crate::cancel::CancellationToken;
use crate::codec::{EchoReply, ProbeIdentity};
use crate::config::{defaults, SessionConfig};
use crate::error::{Error, Result};
use crate::session::{CompletionHandler, ReplyHandler, Session};
use crate::stats::Statistics;
use crate::constants::MAX_PADDING_SIZE;
use crate::{Identifier, MaxTtl, PayloadPadding, ReplyCount, TrackerNonce, MAX_TTL};
use std::fmt::{Debug, Formatter};
use std::net::IpAddr;
use std::process;
use std::time::Duration;

/// Build a probing session.
///
/// # Examples
///
/// ```no_run
/// # fn main() -> anyhow::Result<()> {
/// use pinger_core::Builder;
/// use std::time::Duration;
///
/// let addr = std::net::IpAddr::from([1, 2, 3, 4]);
/// let session = Builder::new(addr)
///     .count(5)
///     .interval(Duration::from_millis(500))
///     .on_reply(|reply, _| println!("{} bytes from {}", reply.bytes, reply.source))
///     .build()?;
/// # Ok(())
/// # }
/// ```
///
/// # See Also
///
/// - [`Session`] - An `ICMP` echo probing session.
pub struct Builder {
    target_addr: IpAddr,
    count: ReplyCount,
    interval: Duration,
    read_timeout: Duration,
    deadline: Duration,
    max_ttl: MaxTtl,
    padding: PayloadPadding,
    identifier: Identifier,
    tracker: Option<TrackerNonce>,
    on_reply: Option<ReplyHandler>,
    on_complete: Option<CompletionHandler>,
    cancellation: Option<CancellationToken>,
}

impl Builder {
    /// Build a session builder for a given target.
    ///
    /// The identifier defaults to one derived from the process id and the
    /// tracker nonce to a random value.
    #[must_use]
    pub fn new(target_addr: IpAddr) -> Self {
        Self {
            target_addr,
            count: ReplyCount(defaults::DEFAULT_COUNT),
            interval: defaults::DEFAULT_INTERVAL,
            read_timeout: defaults::DEFAULT_READ_TIMEOUT,
            deadline: defaults::DEFAULT_DEADLINE,
            max_ttl: MaxTtl(defaults::DEFAULT_MAX_TTL),
            padding: PayloadPadding::from_binary_digits(defaults::DEFAULT_PADDING)
                .unwrap_or_default(),
            identifier: Identifier((process::id() % u32::from(u16::MAX)) as u16),
            tracker: None,
            on_reply: None,
            on_complete: None,
            cancellation: None,
        }
    }

    /// Set the number of replies after which the session ends.
    ///
    /// Zero means the session runs until cancelled or the deadline expires.
    #[must_use]
    pub fn count(self, count: usize) -> Self {
        Self {
            count: ReplyCount(count),
            ..self
        }
    }

    /// Set the interval between probes.
    #[must_use]
    pub fn interval(self, interval: Duration) -> Self {
        Self { interval, ..self }
    }

    /// Set the maximum time a single read waits for a reply.
    #[must_use]
    pub fn read_timeout(self, read_timeout: Duration) -> Self {
        Self {
            read_timeout,
            ..self
        }
    }

    /// Set the overall deadline of the session.
    #[must_use]
    pub fn deadline(self, deadline: Duration) -> Self {
        Self { deadline, ..self }
    }

    /// Set the maximum ttl, replies observed with a greater ttl are flagged.
    #[must_use]
    pub fn max_ttl(self, max_ttl: u16) -> Self {
        Self {
            max_ttl: MaxTtl(max_ttl),
            ..self
        }
    }

    /// Set the padding appended to every probe payload.
    #[must_use]
    pub fn padding(self, padding: PayloadPadding) -> Self {
        Self { padding, ..self }
    }

    /// Set the `ICMP` echo identifier.
    #[must_use]
    pub fn identifier(self, identifier: u16) -> Self {
        Self {
            identifier: Identifier(identifier),
            ..self
        }
    }

    /// Set the tracker nonce, by default a random value is used.
    ///
    /// Only the low 63 bits of `tracker` are used.
    #[must_use]
    pub fn tracker(self, tracker: u64) -> Self {
        Self {
            tracker: Some(TrackerNonce::new(tracker)),
            ..self
        }
    }

    /// Set a handler to be invoked for every matched reply.
    ///
    /// The handler is invoked on the session thread and must not block.
    #[must_use]
    pub fn on_reply<F: FnMut(&EchoReply, bool) + Send + 'static>(self, on_reply: F) -> Self {
        Self {
            on_reply: Some(Box::new(on_reply)),
            ..self
        }
    }

    /// Set a handler to be invoked once the session completes.
    #[must_use]
    pub fn on_complete<F: FnOnce(&Statistics) + Send + 'static>(self, on_complete: F) -> Self {
        Self {
            on_complete: Some(Box::new(on_complete)),
            ..self
        }
    }

    /// Use an existing cancellation token for the session.
    #[must_use]
    pub fn cancellation(self, token: CancellationToken) -> Self {
        Self {
            cancellation: Some(token),
            ..self
        }
    }

    /// Build the [`Session`].
    pub fn build(self) -> Result<Session> {
        if self.max_ttl.0 > MAX_TTL {
            return Err(Error::BadConfig(format!(
                "max_ttl {} > {MAX_TTL}",
                self.max_ttl.0
            )));
        }
        if self.padding.len() > MAX_PADDING_SIZE {
            return Err(Error::BadConfig(format!(
                "padding of {} bytes > {MAX_PADDING_SIZE}",
                self.padding.len()
            )));
        }
        for (name, duration) in [
            ("interval", self.interval),
            ("read_timeout", self.read_timeout),
            ("deadline", self.deadline),
        ] {
            if duration.is_zero() {
                return Err(Error::BadConfig(format!("{name} must be greater than zero")));
            }
        }
        let config = SessionConfig::new(
            self.target_addr,
            self.count,
            self.interval,
            self.read_timeout,
            self.deadline,
            self.max_ttl,
            self.padding,
        );
        let identity = ProbeIdentity {
            identifier: self.identifier,
            tracker: self.tracker.unwrap_or_else(TrackerNonce::random),
        };
        Ok(Session::new(
            config,
            identity,
            self.cancellation.unwrap_or_default(),
            self.on_reply,
            self.on_complete,
        ))
    }
}

impl Debug for Builder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("target_addr", &self.target_addr)
            .field("count", &self.count)
            .field("interval", &self.interval)
            .field("read_timeout", &self.read_timeout)
            .field("deadline", &self.deadline)
            .field("max_ttl", &self.max_ttl)
            .field("padding", &self.padding)
            .field("identifier", &self.identifier)
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}
