//! End-to-end convergence scenarios for the channel synchronizer.
//!
//! These tests drive the synchronizer the way a host dispatcher would:
//! inbound payloads go through `receive`, outbound commands are captured by a
//! recording sink and checked byte for byte.
//!
//! # Running with tracing
//!
//! ```bash
//! RUST_LOG=motesync=debug cargo test -- --nocapture
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use motesync::protocol::frame_type;
use motesync::{Channel, ChannelSynchronizer, Packet, PacketSink, SETTINGS_DISPATCH};

/// Recording sink shared between the test and the synchronizer.
#[derive(Clone, Default)]
struct Outbox(Rc<RefCell<Vec<Packet>>>);

impl Outbox {
    fn sent(&self) -> Vec<Packet> {
        self.0.borrow().clone()
    }

    fn len(&self) -> usize {
        self.0.borrow().len()
    }

    fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl PacketSink for Outbox {
    fn send(&mut self, packet: Packet) {
        self.0.borrow_mut().push(packet);
    }
}

fn synchronizer() -> (ChannelSynchronizer<Outbox>, Outbox) {
    let outbox = Outbox::default();
    (ChannelSynchronizer::new(outbox.clone()), outbox)
}

/// Heartbeat payload: header, u64 uptime seconds, u32 sequence, big-endian.
fn heartbeat(uptime_s: u64, seq: u32) -> Vec<u8> {
    let mut p = vec![frame_type::HEARTBEAT];
    p.extend_from_slice(&uptime_s.to_be_bytes());
    p.extend_from_slice(&seq.to_be_bytes());
    p
}

/// Parameter report payload for an arbitrary name/value pair.
fn report(name: &[u8], value: &[u8]) -> Vec<u8> {
    let mut p = vec![frame_type::PARAMETER_REPORT, 0, 0];
    p.push(name.len() as u8);
    p.push(value.len() as u8);
    p.extend_from_slice(name);
    p.extend_from_slice(value);
    p
}

fn channel_report(value: u8) -> Vec<u8> {
    report(b"radio_channel", &[value])
}

/// The exact command bytes for a given channel.
fn set_command(value: u8) -> Vec<u8> {
    let mut p = vec![0x31, 13, 1];
    p.extend_from_slice(b"radio_channel");
    p.push(value);
    p
}

#[test]
fn spec_scenario_set_then_converge() {
    // desired=5, observed unknown: set emits the command verbatim
    let (mut sync, outbox) = synchronizer();
    sync.set(Some(Channel::new(5)));

    let sent = outbox.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].dispatch, SETTINGS_DISPATCH);
    assert_eq!(sent[0].payload, set_command(5));

    // the node reports channel 5: converged, no further command
    outbox.clear();
    sync.receive(&channel_report(5));
    assert_eq!(sync.get(), Some(Channel::new(5)));
    assert_eq!(outbox.len(), 0);
}

#[test]
fn successive_reports_notify_once_each() {
    let (mut sync, _outbox) = synchronizer();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    sync.register_watcher(move |ch| sink.borrow_mut().push(ch));

    sync.receive(&channel_report(11));
    sync.receive(&channel_report(22));
    sync.receive(&channel_report(22));

    assert_eq!(sync.get(), Some(Channel::new(22)));
    assert_eq!(*seen.borrow(), vec![Channel::new(11), Channel::new(22)]);
}

#[test]
fn mismatched_report_triggers_reassertion() {
    let (mut sync, outbox) = synchronizer();
    sync.set(Some(Channel::new(5)));
    outbox.clear();

    // node still reports the old channel: exactly one re-assertion
    sync.receive(&channel_report(3));
    let sent = outbox.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].payload, set_command(5));
}

#[test]
fn reboot_resets_and_reasserts() {
    let (mut sync, outbox) = synchronizer();

    sync.receive(&heartbeat(7200, 1));
    sync.receive(&channel_report(5));
    sync.set(Some(Channel::new(5)));
    assert_eq!(outbox.len(), 0); // converged

    // uptime collapsed: boot estimate moved by ~7198s, far past tolerance
    sync.receive(&heartbeat(2, 2));
    assert_eq!(sync.get(), Some(Channel::new(0)));
    let sent = outbox.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].payload, set_command(5));
}

#[test]
fn steady_heartbeats_are_not_reboots() {
    let (mut sync, outbox) = synchronizer();

    sync.receive(&heartbeat(7200, 1));
    sync.receive(&channel_report(5));
    sync.set(Some(Channel::new(5)));

    // consistent uptime progression, delivered back to back
    sync.receive(&heartbeat(7200, 2));
    sync.receive(&heartbeat(7201, 3));

    assert_eq!(sync.get(), Some(Channel::new(5)));
    assert_eq!(outbox.len(), 0);
}

#[test]
fn disabling_enforcement_stops_reassertion() {
    let (mut sync, outbox) = synchronizer();
    sync.set(Some(Channel::new(5)));
    outbox.clear();

    sync.set(None);
    sync.receive(&channel_report(3));
    sync.receive(&heartbeat(60, 1));

    assert_eq!(sync.get(), Some(Channel::new(3)));
    assert_eq!(outbox.len(), 0);
}

#[test]
fn id_error_drives_exactly_one_resend() {
    let (mut sync, outbox) = synchronizer();
    sync.set(Some(Channel::new(5)));
    outbox.clear();

    sync.receive(&[frame_type::PARAMETER_ID_ERROR, 0x01]);
    let sent = outbox.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].payload, set_command(5));
}

#[test]
fn repeated_id_errors_are_bounded() {
    let (mut sync, outbox) = synchronizer();
    sync.set(Some(Channel::new(5)));
    outbox.clear();

    for _ in 0..10 {
        sync.receive(&[frame_type::PARAMETER_ID_ERROR]);
    }
    // budget of 3, then silence until a report or set refills it
    assert_eq!(outbox.len(), 3);

    sync.receive(&channel_report(3));
    outbox.clear();
    sync.receive(&[frame_type::PARAMETER_ID_ERROR]);
    assert_eq!(outbox.len(), 1);
}

#[test]
fn short_packets_never_mutate_state() {
    let (mut sync, outbox) = synchronizer();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    sync.register_watcher(move |ch| sink.borrow_mut().push(ch));

    sync.receive(&[]);
    sync.receive(&[frame_type::PARAMETER_REPORT]);
    sync.receive(&[frame_type::PARAMETER_REPORT, 0, 0, 13]);
    sync.receive(&heartbeat(60, 1)[..5]);

    assert_eq!(sync.get(), None);
    assert!(seen.borrow().is_empty());
    assert_eq!(outbox.len(), 0);
}

#[test]
fn foreign_parameter_reports_are_ignored() {
    let (mut sync, outbox) = synchronizer();
    sync.set(Some(Channel::new(5)));
    sync.receive(&channel_report(5));
    outbox.clear();

    sync.receive(&report(b"tx_power", &[3]));
    sync.receive(&report(b"radio_channel", &[0, 5])); // wrong value width

    assert_eq!(sync.get(), Some(Channel::new(5)));
    assert_eq!(outbox.len(), 0);
}
