//! Single-byte radio channel values.

use std::fmt;
use thiserror::Error;

/// A radio channel number as carried on the wire.
///
/// The settings protocol encodes the channel as exactly one byte, so every
/// `u8` is a representable channel. Conversions from wider integers are
/// fallible; see [`InvalidChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Channel(u8);

impl Channel {
    /// Channel the node falls back to after a reboot.
    pub const BOOT_DEFAULT: Self = Self(0);

    /// Creates a channel from its wire byte.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Raw value for wire serialization.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }
}

impl From<u8> for Channel {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<Channel> for u8 {
    fn from(channel: Channel) -> Self {
        channel.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error: a requested channel value does not fit in a single byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("channel {0} outside single-byte range")]
pub struct InvalidChannel(pub u64);

impl TryFrom<u64> for Channel {
    type Error = InvalidChannel;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map(Self)
            .map_err(|_| InvalidChannel(value))
    }
}
