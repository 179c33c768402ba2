//! Seam between the synchronizer and the external packet transport.
//!
//! The transport, framing and multiplexing live outside this crate. The host
//! registers the synchronizer's inbound handler for dispatch type
//! [`SETTINGS_DISPATCH`] and provides a [`PacketSink`] for the outbound
//! direction. Delivery is fire-and-forget: no acknowledgment is surfaced to
//! this layer.

/// Active-message dispatch type carrying the settings protocol.
pub const SETTINGS_DISPATCH: u8 = 0x80;

/// An outbound packet the transport forwards verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Dispatch type identifier.
    pub dispatch: u8,
    /// Opaque payload; byte 0 is the frame discriminator.
    pub payload: Vec<u8>,
}

impl Packet {
    /// Wraps a payload in a settings-protocol packet.
    #[must_use]
    pub fn settings(payload: Vec<u8>) -> Self {
        Self {
            dispatch: SETTINGS_DISPATCH,
            payload,
        }
    }
}

/// Outbound path into the external dispatcher.
pub trait PacketSink {
    /// Transmits a packet. Fire-and-forget.
    fn send(&mut self, packet: Packet);
}

impl<S: PacketSink + ?Sized> PacketSink for &mut S {
    fn send(&mut self, packet: Packet) {
        (**self).send(packet);
    }
}

#[cfg(test)]
impl PacketSink for Vec<Packet> {
    fn send(&mut self, packet: Packet) {
        self.push(packet);
    }
}
