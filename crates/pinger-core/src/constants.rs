use std::time::Duration;

/// The maximum value accepted for the configured maximum time-to-live.
///
/// The observed IP `ttl` (or `IPv6` hop limit) is an u8, so a maximum of 256
/// means no reply can ever exceed it.
pub const MAX_TTL: u16 = 256;

/// The size of the payload prefix which carries the send timestamp and the tracker nonce.
pub const PAYLOAD_HEADER_SIZE: usize = 16;

/// The size of the buffer used to receive datagrams from the raw socket.
///
/// Large enough for any `IPv4` datagram so that no reply is truncated.
pub const MAX_PACKET_SIZE: usize = 65_535;

/// The largest padding which still fits in a single `IPv4` datagram.
///
/// The maximum datagram size less a minimal `IPv4` header, the echo header
/// and the payload header.
pub const MAX_PADDING_SIZE: usize = MAX_PACKET_SIZE - 20 - 8 - PAYLOAD_HEADER_SIZE;

/// The capacity of the queue between the reply reader and the session.
pub const REPLY_QUEUE_CAPACITY: usize = 5;

/// The initial delay before retrying a send which failed for lack of buffer space.
pub const MIN_SEND_BACKOFF: Duration = Duration::from_millis(1);

/// The maximum delay between retries of a send which failed for lack of buffer space.
pub const MAX_SEND_BACKOFF: Duration = Duration::from_millis(100);
