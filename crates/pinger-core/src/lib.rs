//! Pinger - An `ICMP` echo probing library.
//!
//! This crate provides the probing engine used by the standalone `pinger`
//! application.
//!
//! A [`Session`] sends `ICMP` echo requests to a single target at a fixed
//! interval over a raw socket, matches the echo replies it receives against
//! the identifier and tracker nonce embedded in every probe and reports the
//! round trip time of each matched reply.  The session ends when the
//! configured number of replies has been received, the deadline expires or
//! the session is cancelled, at which point the aggregated [`Statistics`] are
//! reported.
//!
//! # Example
//!
//! The following example sends probes to a target until 3 replies have been
//! received, printing each reply and the final statistics:
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! # use std::net::IpAddr;
//! # use std::str::FromStr;
//! use pinger_core::Builder;
//!
//! let addr = IpAddr::from_str("1.1.1.1")?;
//! Builder::new(addr)
//!     .count(3)
//!     .on_reply(|reply, _| println!("{:?}", reply))
//!     .on_complete(|stats| println!("{:?}", stats))
//!     .build()?
//!     .run()?;
//! # Ok(())
//! # }
//! ```
//!
//! # See Also
//!
//! - [`Builder`] - Build a [`Session`].
//! - [`Session::run`] - Run the session on the current thread.
//! - [`Session::spawn`] - Run the session on a new thread.
//! - [`CancellationToken`] - Stop a running session.
#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::option_if_let_else,
    clippy::missing_const_for_fn,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]
#![deny(unsafe_code)]

mod builder;
mod cancel;
mod codec;
mod config;
mod constants;
mod error;
mod net;
mod reader;
mod sender;
mod session;
mod stats;
mod types;

pub use builder::Builder;
pub use cancel::CancellationToken;
pub use codec::{DecodeError, EchoReply, ProbeIdentity};
pub use config::{defaults, IpAddrFamily, SessionConfig};
pub use constants::{MAX_PADDING_SIZE, MAX_TTL, PAYLOAD_HEADER_SIZE};
pub use error::{Error, ErrorKind, IoError, IoOperation, Result};
pub use session::{CompletionHandler, CompletionReason, ReplyHandler, Session};
pub use stats::Statistics;
pub use types::{
    Identifier, MaxTtl, PayloadPadding, ReplyCount, Sequence, TimeToLive, TrackerNonce,
};
