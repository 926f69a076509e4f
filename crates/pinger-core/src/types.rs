use crate::error::{Error, Result};

/// `Sequence` number newtype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Sequence(pub u16);

/// `Identifier` newtype.
///
/// The `ICMP` echo identifier shared by every probe in a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Identifier(pub u16);

/// `TrackerNonce` newtype.
///
/// A random 63-bit value carried in the payload of every probe in a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct TrackerNonce(pub u64);

impl TrackerNonce {
    /// Create a tracker nonce from `value` with the most significant bit cleared.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value & (u64::MAX >> 1))
    }

    /// Generate a random tracker nonce with the most significant bit clear.
    #[must_use]
    pub fn random() -> Self {
        Self::new(rand::random::<u64>())
    }
}

/// `TimeToLive` (ttl) newtype.
///
/// The `IPv4` ttl or `IPv6` hop limit observed on a received reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd)]
pub struct TimeToLive(pub u8);

/// `MaxTtl` newtype.
///
/// Replies observed with a ttl strictly greater than this are counted as
/// having exceeded it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd)]
pub struct MaxTtl(pub u16);

impl MaxTtl {
    /// Does the observed `ttl` exceed this maximum?
    #[must_use]
    pub fn is_exceeded_by(self, ttl: TimeToLive) -> bool {
        u16::from(ttl.0) > self.0
    }
}

/// `ReplyCount` newtype.
///
/// The number of matched replies after which the session ends, zero means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd)]
pub struct ReplyCount(pub usize);

impl ReplyCount {
    #[must_use]
    pub const fn is_unbounded(self) -> bool {
        self.0 == 0
    }

    /// Has `value` reached this (bounded) count?
    #[must_use]
    pub const fn is_reached_by(self, value: usize) -> bool {
        !self.is_unbounded() && value >= self.0
    }
}

/// `PayloadPadding` newtype.
///
/// Bytes appended to the timestamp and tracker nonce of every probe payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadPadding(pub Vec<u8>);

impl PayloadPadding {
    /// Parse a padding pattern expressed as a string of binary digits.
    ///
    /// Every group of 8 digits forms one byte, most significant bit first.  A
    /// trailing group of fewer than 8 digits is filled with zero bits on the
    /// right.
    ///
    /// ```
    /// # fn main() -> anyhow::Result<()> {
    /// use pinger_core::PayloadPadding;
    ///
    /// let padding = PayloadPadding::from_binary_digits("1010101011")?;
    /// assert_eq!(vec![0xaa, 0xc0], padding.0);
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_binary_digits(digits: &str) -> Result<Self> {
        if let Some(invalid) = digits.chars().find(|c| !matches!(c, '0' | '1')) {
            return Err(Error::BadConfig(format!(
                "padding must contain only 0s and 1s, found {invalid:?}"
            )));
        }
        let bytes = digits
            .as_bytes()
            .chunks(8)
            .map(|group| {
                group
                    .iter()
                    .enumerate()
                    .filter(|(_, digit)| **digit == b'1')
                    .fold(0_u8, |byte, (i, _)| byte | (0x80 >> i))
            })
            .collect();
        Ok(Self(bytes))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
