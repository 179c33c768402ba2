//! Channel convergence state machine.
//!
//! # Design
//!
//! - Entirely reactive: the host dispatcher calls [`ChannelSynchronizer::receive`]
//!   synchronously on packet arrival; there are no timers or polling.
//! - Reboot detection: the node's uptime counter resets to zero on reboot.
//!   Each heartbeat yields a boot-time estimate (`now - uptime`); when two
//!   estimates disagree by more than a small tolerance, the node must have
//!   restarted, its channel has reverted to the post-boot default, and the
//!   desired channel is re-asserted.
//! - Error-driven retry: an id-error report means the command was likely lost
//!   or rejected (node busy or radio off), so the command is resent. Resends
//!   are bounded by a budget that refills on every channel report and every
//!   `set` call; subsequent heartbeats keep re-asserting regardless.
//! - Single-threaded: every mutating entry point takes `&mut self`, so the
//!   one-mutator-at-a-time requirement is a compile-time property. A host
//!   delivering packets from multiple threads must wrap the instance in a
//!   mutex around whole handler invocations.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, SystemTime};

use crate::channel::Channel;
use crate::dispatch::{Packet, PacketSink};
use crate::protocol::{
    self, FrameError, HeartbeatFrame, MoteFrame, ParameterReportFrame,
};
use crate::trace::{debug, info, warn};

/// Heartbeat jitter and network delay absorbed before two boot-time estimates
/// count as a reboot.
const BOOT_TOLERANCE: Duration = Duration::from_secs(3);

/// Consecutive error-driven resends allowed before waiting for a report or
/// heartbeat to restart convergence.
const RESEND_BUDGET: u8 = 3;

/// Handle identifying a registered watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatcherId(u64);

impl fmt::Display for WatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watcher#{}", self.0)
    }
}

type WatcherFn = Box<dyn FnMut(Channel)>;

/// Owned registry of observed-channel watchers, keyed by handle.
struct WatcherSet {
    next_id: u64,
    watchers: HashMap<u64, WatcherFn>,
}

impl WatcherSet {
    fn new() -> Self {
        Self {
            next_id: 0,
            watchers: HashMap::new(),
        }
    }

    fn register(&mut self, watcher: WatcherFn) -> WatcherId {
        let id = self.next_id;
        self.next_id += 1;
        self.watchers.insert(id, watcher);
        WatcherId(id)
    }

    fn deregister(&mut self, id: WatcherId) -> bool {
        self.watchers.remove(&id.0).is_some()
    }

    fn notify(&mut self, channel: Channel) {
        for watcher in self.watchers.values_mut() {
            watcher(channel);
        }
    }
}

/// Tracks and enforces the radio channel of one mote.
///
/// Holds the operator-desired channel and the channel the node last reported,
/// and converges the two by sending set-parameter commands through the
/// [`PacketSink`] it was constructed with.
pub struct ChannelSynchronizer<S: PacketSink> {
    sink: S,
    observed: Option<Channel>,
    desired: Option<Channel>,
    /// Boot-time estimate from the most recent heartbeat; `None` until one
    /// arrives, so the first heartbeat can never be mistaken for a reboot.
    last_boot: Option<SystemTime>,
    watchers: WatcherSet,
    resend_budget: u8,
}

impl<S: PacketSink> ChannelSynchronizer<S> {
    /// Creates a synchronizer bound to an outbound packet sink.
    ///
    /// The host must additionally route inbound packets of dispatch type
    /// [`SETTINGS_DISPATCH`](crate::dispatch::SETTINGS_DISPATCH) to
    /// [`receive`](Self::receive). A fresh instance reports no observed
    /// channel and enforces nothing until [`set`](Self::set) is called.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            observed: None,
            desired: None,
            last_boot: None,
            watchers: WatcherSet::new(),
            resend_budget: RESEND_BUDGET,
        }
    }

    /// Returns the channel the node last reported. No side effects.
    #[must_use]
    pub fn get(&self) -> Option<Channel> {
        self.observed
    }

    /// Sets the desired channel.
    ///
    /// `Some(channel)` sends a set-parameter command when the node's reported
    /// channel differs. `None` disables enforcement: no packet is sent and
    /// future mismatches are ignored until a channel is set again.
    pub fn set(&mut self, channel: Option<Channel>) {
        self.desired = channel;
        self.resend_budget = RESEND_BUDGET;
        match channel {
            Some(desired) if self.observed != Some(desired) => {
                self.send_set_channel(desired);
            }
            Some(_) => {}
            None => debug!("channel enforcement disabled"),
        }
    }

    /// Re-asserts the desired channel when it differs from the observed one.
    ///
    /// May emit an outbound packet.
    pub fn check_channel(&mut self) {
        if let Some(desired) = self.desired {
            if self.observed != Some(desired) {
                self.send_set_channel(desired);
            }
        }
    }

    /// Registers a watcher invoked synchronously with every observed-channel
    /// change. Watchers must not block or re-enter the synchronizer.
    pub fn register_watcher(&mut self, watcher: impl FnMut(Channel) + 'static) -> WatcherId {
        self.watchers.register(Box::new(watcher))
    }

    /// Removes a watcher. Returns `false` when the handle was not registered;
    /// deregistering an absent watcher is a no-op.
    pub fn deregister_watcher(&mut self, id: WatcherId) -> bool {
        self.watchers.deregister(id)
    }

    /// Inbound handler, invoked by the host dispatcher for every payload of
    /// the settings dispatch type.
    ///
    /// Protocol anomalies are logged and dropped, never surfaced; empty
    /// payloads are ignored entirely.
    pub fn receive(&mut self, payload: &[u8]) {
        match protocol::decode_frame(payload) {
            Ok(MoteFrame::Heartbeat(heartbeat)) => self.on_heartbeat(heartbeat),
            Ok(MoteFrame::ParameterReport(report)) => self.on_report(report),
            Ok(MoteFrame::ParameterIdError(tail)) => self.on_id_error(tail),
            Ok(MoteFrame::ParameterSeqError(tail)) => {
                // no retry: resending on a sequencing fault would amplify it
                warn!(payload = ?tail, "parameter seq error");
            }
            Err(FrameError::Empty) => {}
            Err(err @ FrameError::Short { .. }) => {
                warn!(len = payload.len(), %err, "packet too short");
            }
            Err(FrameError::UnknownHeader(header)) => {
                debug!(header = format_args!("{header:02x}"), "unexpected header");
            }
        }
    }

    fn on_heartbeat(&mut self, heartbeat: HeartbeatFrame) {
        let now = SystemTime::now();
        let Some(boot) = now.checked_sub(Duration::from_secs(heartbeat.uptime_s)) else {
            warn!(uptime_s = heartbeat.uptime_s, "implausible uptime");
            return;
        };

        if let Some(previous) = self.last_boot {
            if drift(previous, boot) > BOOT_TOLERANCE {
                warn!(uptime_s = heartbeat.uptime_s, "node restarted");
                self.observed = Some(Channel::BOOT_DEFAULT);
            }
        }
        self.last_boot = Some(boot);

        self.check_channel();
    }

    fn on_report(&mut self, report: ParameterReportFrame<'_>) {
        let Some(channel) = report.channel() else {
            debug!(
                name = %String::from_utf8_lossy(report.name),
                value = ?report.value,
                "unexpected parameter"
            );
            return;
        };

        self.resend_budget = RESEND_BUDGET;
        if self.observed != Some(channel) {
            self.observed = Some(channel);
            self.watchers.notify(channel);
        }
        info!(%channel, "radio channel reported");

        self.check_channel();
    }

    fn on_id_error(&mut self, tail: &[u8]) {
        // most likely EBUSY or EOFF on the node
        warn!(payload = ?tail, "parameter id error");

        if let Some(desired) = self.desired {
            if self.observed != Some(desired) {
                if self.resend_budget == 0 {
                    warn!(%desired, "resend budget exhausted, waiting for report or heartbeat");
                    return;
                }
                self.resend_budget -= 1;
                self.send_set_channel(desired);
            }
        }
    }

    fn send_set_channel(&mut self, channel: Channel) {
        debug!(%channel, "sending set-parameter command");
        self.sink
            .send(Packet::settings(protocol::encode_set_channel(channel)));
    }
}

/// Magnitude of the difference between two wall-clock instants.
fn drift(a: SystemTime, b: SystemTime) -> Duration {
    b.duration_since(a).unwrap_or_else(|err| err.duration())
}
