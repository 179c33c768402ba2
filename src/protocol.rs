//! Wire codec for the mote settings protocol.
//!
//! All frames ride dispatch type [`SETTINGS_DISPATCH`](crate::dispatch::SETTINGS_DISPATCH)
//! and carry their discriminator in payload byte 0. Multi-byte integers are
//! big-endian.
//!
//! Inbound frames:
//!
//! ```text
//! Heartbeat (0x00):
//! ┌─────────┬───────────────────────┬───────────────┐
//! │ 0x00(1) │ Uptime seconds (8)    │ Sequence (4)  │
//! └─────────┴───────────────────────┴───────────────┘
//!
//! Parameter report (0x10):
//! ┌─────────┬────────┬────────┬───────────┬────────────┬─────────┬──────────┐
//! │ 0x10(1) │ Rsv(1) │ Rsv(1) │ IdLen(1)  │ ValLen(1)  │ Name(n) │ Value(m) │
//! └─────────┴────────┴────────┴───────────┴────────────┴─────────┴──────────┘
//!
//! Parameter errors (0xF0 id, 0xF1 seq): opaque tail after the discriminator.
//! ```
//!
//! Outbound frame:
//!
//! ```text
//! Set parameter with id (0x31):
//! ┌─────────┬────────────┬────────────┬─────────┬──────────┐
//! │ 0x31(1) │ NameLen(1) │ Count=1(1) │ Name(n) │ Value(1) │
//! └─────────┴────────────┴────────────┴─────────┴──────────┘
//! ```

use thiserror::Error;

use crate::channel::Channel;

/// Name of the parameter this protocol instance tracks.
pub const PARAMETER_NAME: &str = "radio_channel";

/// Frame discriminator bytes (payload byte 0).
pub mod frame_type {
    pub const HEARTBEAT: u8 = 0x00;
    pub const PARAMETER_REPORT: u8 = 0x10;
    pub const SET_PARAMETER_WITH_ID: u8 = 0x31;
    pub const PARAMETER_ID_ERROR: u8 = 0xF0;
    pub const PARAMETER_SEQ_ERROR: u8 = 0xF1;
}

/// Node liveness announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatFrame {
    /// Seconds since the node last booted.
    pub uptime_s: u64,
    /// Heartbeat sequence field (unused by this layer).
    pub seq: u32,
}

/// Report of a named parameter's current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterReportFrame<'a> {
    /// Parameter name bytes.
    pub name: &'a [u8],
    /// Parameter value bytes.
    pub value: &'a [u8],
}

impl ParameterReportFrame<'_> {
    /// Returns the reported channel when this frame reports the tracked
    /// parameter with a single-byte value, `None` otherwise.
    #[must_use]
    pub fn channel(&self) -> Option<Channel> {
        if self.name == PARAMETER_NAME.as_bytes() && self.value.len() == 1 {
            Some(Channel::new(self.value[0]))
        } else {
            None
        }
    }
}

/// All inbound frame variants, discriminated by payload byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoteFrame<'a> {
    /// Liveness and uptime (0x00).
    Heartbeat(HeartbeatFrame),
    /// Current value of a named parameter (0x10).
    ParameterReport(ParameterReportFrame<'a>),
    /// Node rejected addressing by id, likely busy or off (0xF0).
    ParameterIdError(&'a [u8]),
    /// Sequence mismatch on a command (0xF1).
    ParameterSeqError(&'a [u8]),
}

/// Errors while decoding an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Payload contained no bytes at all.
    #[error("empty payload")]
    Empty,
    /// Payload ends before the frame's declared contents.
    #[error("packet too short: need {need} bytes, have {have}")]
    Short { need: usize, have: usize },
    /// Unrecognized discriminator byte.
    #[error("unknown frame header 0x{0:02x}")]
    UnknownHeader(u8),
}

/// Reader for decoding inbound frames.
struct FrameReader<'a> {
    buf: &'a [u8],
    cursor: usize,
}

impl<'a> FrameReader<'a> {
    const fn new(buf: &'a [u8]) -> Self {
        Self { buf, cursor: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.cursor
    }

    fn take_u8(&mut self) -> Result<u8, FrameError> {
        if self.remaining() < 1 {
            return Err(FrameError::Short {
                need: 1,
                have: self.remaining(),
            });
        }
        let v = self.buf[self.cursor];
        self.cursor += 1;
        Ok(v)
    }

    fn take_u32(&mut self) -> Result<u32, FrameError> {
        if self.remaining() < 4 {
            return Err(FrameError::Short {
                need: 4,
                have: self.remaining(),
            });
        }
        let mut arr = [0u8; 4];
        arr.copy_from_slice(&self.buf[self.cursor..self.cursor + 4]);
        self.cursor += 4;
        Ok(u32::from_be_bytes(arr))
    }

    fn take_u64(&mut self) -> Result<u64, FrameError> {
        if self.remaining() < 8 {
            return Err(FrameError::Short {
                need: 8,
                have: self.remaining(),
            });
        }
        let mut arr = [0u8; 8];
        arr.copy_from_slice(&self.buf[self.cursor..self.cursor + 8]);
        self.cursor += 8;
        Ok(u64::from_be_bytes(arr))
    }

    fn take_bytes(&mut self, n: usize) -> Result<&'a [u8], FrameError> {
        if self.remaining() < n {
            return Err(FrameError::Short {
                need: n,
                have: self.remaining(),
            });
        }
        let bytes = &self.buf[self.cursor..self.cursor + n];
        self.cursor += n;
        Ok(bytes)
    }

    fn rest(&self) -> &'a [u8] {
        &self.buf[self.cursor..]
    }
}

/// Decode an inbound frame from a raw payload.
///
/// Trailing bytes beyond a frame's declared contents are ignored. A parameter
/// report whose declared name/value lengths overrun the payload is rejected
/// as [`FrameError::Short`].
pub fn decode_frame(payload: &[u8]) -> Result<MoteFrame<'_>, FrameError> {
    if payload.is_empty() {
        return Err(FrameError::Empty);
    }

    let mut r = FrameReader::new(payload);
    let header = r.take_u8()?;

    match header {
        frame_type::HEARTBEAT => {
            let uptime_s = r.take_u64()?;
            let seq = r.take_u32()?;
            Ok(MoteFrame::Heartbeat(HeartbeatFrame { uptime_s, seq }))
        }
        frame_type::PARAMETER_REPORT => {
            let _reserved0 = r.take_u8()?;
            let _reserved1 = r.take_u8()?;
            let id_len = r.take_u8()?;
            let value_len = r.take_u8()?;
            let name = r.take_bytes(usize::from(id_len))?;
            let value = r.take_bytes(usize::from(value_len))?;
            Ok(MoteFrame::ParameterReport(ParameterReportFrame {
                name,
                value,
            }))
        }
        frame_type::PARAMETER_ID_ERROR => Ok(MoteFrame::ParameterIdError(r.rest())),
        frame_type::PARAMETER_SEQ_ERROR => Ok(MoteFrame::ParameterSeqError(r.rest())),
        other => Err(FrameError::UnknownHeader(other)),
    }
}

/// Encode a set-parameter-with-id command for the tracked parameter.
#[must_use]
pub fn encode_set_channel(channel: Channel) -> Vec<u8> {
    let name = PARAMETER_NAME.as_bytes();
    let mut buf = Vec::with_capacity(3 + name.len() + 1);
    buf.push(frame_type::SET_PARAMETER_WITH_ID);
    buf.push(name.len() as u8);
    buf.push(1); // value count
    buf.extend_from_slice(name);
    buf.push(channel.as_u8());
    buf
}
