//! Telemetry delivery: buffering while offline, reconnect flush,
//! acknowledgement tracking and timeout republish.

use std::sync::Arc;

use smartsafe::adapters::channel_sink::ChannelSink;
use smartsafe::app::events::KeyEvent;
use smartsafe::app::motion::Sensitivity;
use smartsafe::app::ports::TimePort;
use smartsafe::app::service::ControlService;
use smartsafe::channels::Channels;
use smartsafe::config::SystemConfig;
use smartsafe::fsm::SafeState;
use smartsafe::link::route_link_event;
use smartsafe::link::transport::{DeliveryId, LinkEvent, Qos};
use smartsafe::tasks::telemetry::TelemetryTask;
use smartsafe::telemetry::publisher::{PublisherConfig, SweepReport, TelemetryPublisher};
use smartsafe::telemetry::TelemetryEvent;

use super::mocks::{ManualClock, MemNvs, NoDelay, RecordingLink};

const ACK_TIMEOUT_MS: u32 = 10_000;

fn publisher() -> TelemetryPublisher {
    TelemetryPublisher::new(
        SystemConfig::default().telemetry_topic(),
        PublisherConfig::default(),
    )
}

fn event(ts: u32) -> TelemetryEvent {
    TelemetryEvent::state_change(ts, SafeState::Locked)
}

// ── Scenario C: offline buffering and reconnect flush ─────────

#[test]
fn scenario_c_offline_events_flush_in_order() {
    let p = publisher();
    let mut link = RecordingLink::new();
    let clock = ManualClock::new(0);

    for ts in 1..=12 {
        assert!(!p.publish(&mut link, event(ts), clock.now_ms()).unwrap());
        clock.advance(50);
    }
    assert!(link.published.is_empty());

    let stats = p.stats().unwrap();
    assert_eq!(stats.buffered, 10);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.evictions, 2);

    p.set_connected(true);
    let mut delay = NoDelay::default();
    let sent = p.flush_backlog(&mut link, &mut delay, &clock).unwrap();

    assert_eq!(sent, 10);
    assert_eq!(link.timestamps(), (3..=12).collect::<Vec<u64>>());
    assert_eq!(link.ids(), (1..=10).collect::<Vec<DeliveryId>>());
    // Nine gaps of 100 ms between ten publishes.
    assert_eq!(delay.total_ns, 9 * 100_000_000);

    let stats = p.stats().unwrap();
    assert_eq!(stats.buffered, 10);
    assert_eq!(stats.pending, 10);

    for id in 1..=10 {
        assert!(p.on_delivered(id).unwrap());
    }
    assert_eq!(p.stats().unwrap().buffered, 0);
}

#[test]
fn published_payload_uses_telemetry_topic_and_qos1() {
    let p = publisher();
    let mut link = RecordingLink::new();
    p.set_connected(true);
    p.publish(&mut link, TelemetryEvent::movement(5, SafeState::Alarm, 1.25), 0)
        .unwrap();

    let msg = &link.published[0];
    assert_eq!(msg.topic, "smartsafe/smartsafe01/telemetry");
    assert_eq!(msg.qos, Qos::AtLeastOnce);
    assert_eq!(
        msg.payload,
        serde_json::json!({"ts": 5, "state": "alarm", "event": "movement", "movement_amount": 1.25})
    );
}

// ── Scenario D: missing acknowledgement ──────────────────────

#[test]
fn scenario_d_unacknowledged_event_republished_with_new_id() {
    let p = publisher();
    let mut link = RecordingLink::new();
    p.set_connected(true);

    assert!(p.publish(&mut link, event(1), 0).unwrap());
    assert_eq!(link.ids(), [1 as DeliveryId]);

    let report = p.sweep_timeouts(&mut link, ACK_TIMEOUT_MS - 1).unwrap();
    assert_eq!(report, SweepReport::default());
    assert_eq!(link.published.len(), 1);

    let report = p.sweep_timeouts(&mut link, ACK_TIMEOUT_MS).unwrap();
    assert_eq!(report.republished, 1);
    assert_eq!(link.ids(), [1 as DeliveryId, 2]);
    assert_eq!(link.published[0].payload, link.published[1].payload);

    // The superseded id no longer matches anything.
    assert!(!p.on_delivered(1).unwrap());
    assert_eq!(p.stats().unwrap().buffered, 1);
    assert!(p.on_delivered(2).unwrap());
    assert_eq!(p.stats().unwrap().buffered, 0);
}

#[test]
fn republish_resets_the_timeout() {
    let p = publisher();
    let mut link = RecordingLink::new();
    p.set_connected(true);
    p.publish(&mut link, event(1), 0).unwrap();

    p.sweep_timeouts(&mut link, ACK_TIMEOUT_MS).unwrap();
    let report = p.sweep_timeouts(&mut link, ACK_TIMEOUT_MS + 2_000).unwrap();
    assert_eq!(report.republished, 0);
    let report = p.sweep_timeouts(&mut link, 2 * ACK_TIMEOUT_MS).unwrap();
    assert_eq!(report.republished, 1);
    assert_eq!(link.ids(), [1 as DeliveryId, 2, 3]);
}

#[test]
fn timeout_while_disconnected_waits_for_reconnect() {
    let p = publisher();
    let mut link = RecordingLink::new();
    p.set_connected(true);
    p.publish(&mut link, event(1), 0).unwrap();
    p.set_connected(false);

    let report = p.sweep_timeouts(&mut link, ACK_TIMEOUT_MS).unwrap();
    assert_eq!(report.demoted, 1);
    assert_eq!(link.published.len(), 1);
    let entry = p.entries().unwrap()[0];
    assert!(!entry.pending);
    assert_eq!(entry.delivery_id, None);

    p.set_connected(true);
    let sent = p
        .flush_backlog(&mut link, &mut NoDelay::default(), &ManualClock::new(ACK_TIMEOUT_MS))
        .unwrap();
    assert_eq!(sent, 1);
    assert_eq!(link.ids(), [1 as DeliveryId, 2]);
}

#[test]
fn refused_publish_is_retried_by_sweep() {
    let p = publisher();
    let mut link = RecordingLink::new();
    p.set_connected(true);
    link.refuse = true;
    assert!(!p.publish(&mut link, event(1), 0).unwrap());
    assert_eq!(p.stats().unwrap().pending, 0);

    link.refuse = false;
    let report = p.sweep_timeouts(&mut link, 2_000).unwrap();
    assert_eq!(report.retried, 1);
    assert_eq!(p.stats().unwrap().pending, 1);
}

#[test]
fn duplicate_and_unknown_acks_are_ignored() {
    let p = publisher();
    let mut link = RecordingLink::new();
    p.set_connected(true);
    p.publish(&mut link, event(1), 0).unwrap();
    p.publish(&mut link, event(2), 0).unwrap();

    assert!(p.on_delivered(1).unwrap());
    assert!(!p.on_delivered(1).unwrap());
    assert!(!p.on_delivered(99).unwrap());

    let left = p.entries().unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].event.timestamp, 2);
}

#[test]
fn eviction_drops_oldest_even_when_pending() {
    let p = publisher();
    let mut link = RecordingLink::new();
    p.set_connected(true);
    for ts in 1..=11 {
        p.publish(&mut link, event(ts), 0).unwrap();
    }
    assert_eq!(p.stats().unwrap().evictions, 1);
    assert!(!p.on_delivered(1).unwrap());
    assert_eq!(p.entries().unwrap()[0].event.timestamp, 2);
}

#[test]
fn timeout_survives_tick_wraparound() {
    let p = publisher();
    let mut link = RecordingLink::new();
    p.set_connected(true);
    let start = u32::MAX - 1_000;
    p.publish(&mut link, event(1), start).unwrap();

    let report = p.sweep_timeouts(&mut link, start.wrapping_add(9_000)).unwrap();
    assert_eq!(report.republished, 0);
    let report = p.sweep_timeouts(&mut link, start.wrapping_add(ACK_TIMEOUT_MS)).unwrap();
    assert_eq!(report.republished, 1);
}

// ── Control → channel → telemetry task → wire ────────────────

#[test]
fn keypad_unlock_reaches_the_wire() {
    let channels = Channels::new();
    let clock = ManualClock::new(0);
    let publisher = Arc::new(publisher());
    let mut service = ControlService::new(
        &SystemConfig::default(),
        MemNvs::new(),
        clock.clone(),
        Arc::new(Sensitivity::default()),
    )
    .unwrap();
    let mut task = TelemetryTask::new(
        publisher.clone(),
        RecordingLink::new(),
        clock.clone(),
        NoDelay::default(),
        2_000,
    );

    {
        let mut sink = ChannelSink::new(&channels, Some(publisher.as_ref()), clock.clone());
        for c in "1234#".chars() {
            service.handle_key(KeyEvent::new(c).unwrap(), &mut sink).unwrap();
        }
    }
    assert_eq!(service.state(), SafeState::Unlocked);

    // Offline: both events land in the ring.
    task.step(&channels).unwrap();
    task.step(&channels).unwrap();
    assert!(task.link().published.is_empty());
    assert_eq!(publisher.stats().unwrap().buffered, 2);

    route_link_event(LinkEvent::Connected, &channels);
    task.step(&channels).unwrap();

    let wire: Vec<_> = task.link().published.iter().map(|p| p.payload.clone()).collect();
    assert_eq!(
        wire,
        [
            serde_json::json!({"ts": 1_700_000_000u32, "state": "unlocked", "event": "code_entry", "code_ok": true}),
            serde_json::json!({"ts": 1_700_000_000u32, "state": "unlocked", "event": "state_change"}),
        ]
    );

    route_link_event(LinkEvent::Delivered(1), &channels);
    route_link_event(LinkEvent::Delivered(2), &channels);
    task.step(&channels).unwrap();
    assert_eq!(publisher.stats().unwrap().buffered, 0);
}
