//! Radio channel convergence for a remote wireless sensor mote.
//!
//! A mote periodically announces its liveness (heartbeats carrying its uptime)
//! and reports the current value of named configuration parameters. This crate
//! tracks one such parameter — `radio_channel` — and drives it toward an
//! operator-desired value by issuing set-parameter commands whenever the
//! reported channel diverges from the desired one.
//!
//! The crate is entirely reactive: an external packet dispatcher delivers
//! inbound payloads to [`ChannelSynchronizer::receive`] and transports the
//! outbound commands it emits through a [`PacketSink`]. There are no timers
//! and no polling; retries are driven by subsequent heartbeats and by error
//! reports from the node.
//!
//! # Example
//!
//! ```
//! use motesync::{Channel, ChannelSynchronizer, Packet, PacketSink};
//!
//! struct Transport;
//! impl PacketSink for Transport {
//!     fn send(&mut self, packet: Packet) {
//!         // hand the packet to the connection layer
//!         let _ = packet;
//!     }
//! }
//!
//! let mut sync = ChannelSynchronizer::new(Transport);
//! sync.set(Some(Channel::new(26)));
//! // the host dispatcher now feeds inbound payloads:
//! // sync.receive(&payload);
//! ```

pub mod channel;
pub mod dispatch;
pub mod protocol;
pub mod synchronizer;
mod trace;

#[doc(inline)]
pub use channel::{Channel, InvalidChannel};
#[doc(inline)]
pub use dispatch::{Packet, PacketSink, SETTINGS_DISPATCH};
#[doc(inline)]
pub use synchronizer::{ChannelSynchronizer, WatcherId};

pub use trace::init_tracing;
