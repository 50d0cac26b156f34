//! Inbound command payloads routed through the channels into the control
//! task, and the telemetry JSON that comes back out.

use std::sync::Arc;

use smartsafe::app::motion::Sensitivity;
use smartsafe::app::pin::{PIN_KEY, PIN_NAMESPACE};
use smartsafe::app::service::ControlService;
use smartsafe::channels::Channels;
use smartsafe::config::SystemConfig;
use smartsafe::drivers::watchdog::Watchdog;
use smartsafe::error::Error;
use smartsafe::fsm::SafeState;
use smartsafe::link::codec::encode_telemetry;
use smartsafe::link::route_command;
use smartsafe::tasks::{self, control::ControlTask};
use smartsafe::telemetry::{TelemetryEvent, TelemetryKind};

use super::mocks::{ManualClock, MemNvs, RecordingSink};

type Task = ControlTask<MemNvs, ManualClock>;

fn task(nvs: MemNvs) -> Task {
    let config = SystemConfig::default();
    let service = ControlService::new(
        &config,
        nvs,
        ManualClock::new(0),
        Arc::new(Sensitivity::default()),
    )
    .unwrap();
    ControlTask::new(service, Watchdog::new(config.watchdog_timeout_ms), 1)
}

/// Route `payload` as if it arrived on the command topic, then let the
/// control task consume it.
fn deliver(task: &mut Task, channels: &Channels, sink: &mut RecordingSink, payload: &[u8]) -> bool {
    let queued = route_command(payload, &channels.command);
    task.step(channels, sink).unwrap();
    queued
}

#[test]
fn unlock_then_lock_over_the_wire() {
    let channels = Channels::new();
    let mut sink = RecordingSink::new();
    let mut t = task(MemNvs::new());

    assert!(deliver(&mut t, &channels, &mut sink, br#"{"command":"unlock"}"#));
    assert_eq!(t.service().state(), SafeState::Unlocked);
    assert!(deliver(&mut t, &channels, &mut sink, br#"{"command":"lock"}"#));
    assert_eq!(t.service().state(), SafeState::Locked);

    let wire: Vec<String> = sink
        .of_kind(TelemetryKind::StateChange)
        .iter()
        .map(|e| String::from_utf8(encode_telemetry(e).unwrap()).unwrap())
        .collect();
    assert_eq!(
        wire,
        [
            r#"{"ts":1700000000,"state":"unlocked","event":"state_change"}"#,
            r#"{"ts":1700000000,"state":"locked","event":"state_change"}"#,
        ]
    );
}

#[test]
fn set_code_over_the_wire_is_persisted() {
    let channels = Channels::new();
    let nvs = MemNvs::new();
    let mut sink = RecordingSink::new();
    let mut t = task(nvs.clone());

    assert!(deliver(
        &mut t,
        &channels,
        &mut sink,
        br#"{"command":"set_code","code":"4321"}"#
    ));
    assert_eq!(nvs.get(PIN_NAMESPACE, PIN_KEY).as_deref(), Some(&b"4321"[..]));

    let changed = sink.of_kind(TelemetryKind::CodeChanged);
    assert_eq!(
        encode_telemetry(&changed[0]).unwrap(),
        br#"{"ts":1700000000,"state":"locked","event":"code_changed","code_ok":true}"#
    );
}

#[test]
fn malformed_payloads_never_reach_the_control_task() {
    let channels = Channels::new();
    let nvs = MemNvs::new();
    let mut sink = RecordingSink::new();
    let mut t = task(nvs.clone());

    let rejects: [&[u8]; 6] = [
        br#"{"code":"1234"}"#,
        br#"{"command":"set_code","code":"12345"}"#,
        br#"{"command":"set_code","code":"12a4"}"#,
        br#"{"command":"open_sesame"}"#,
        br#"{"command":"set_sensitivity"}"#,
        b"\xff\xfe",
    ];
    for payload in rejects {
        assert!(!deliver(&mut t, &channels, &mut sink, payload));
    }

    assert_eq!(t.service().state(), SafeState::Locked);
    assert!(sink.telemetry.is_empty());
    assert_eq!(nvs.get(PIN_NAMESPACE, PIN_KEY), None);
}

#[test]
fn sensitivity_over_the_wire_is_clamped() {
    let channels = Channels::new();
    let mut sink = RecordingSink::new();
    let mut t = task(MemNvs::new());

    deliver(
        &mut t,
        &channels,
        &mut sink,
        br#"{"command":"set_sensitivity","threshold":25000}"#,
    );
    assert_eq!(t.service().sensitivity().get(), 25_000);
    deliver(
        &mut t,
        &channels,
        &mut sink,
        br#"{"command":"set_sensitivity","threshold":-4}"#,
    );
    assert_eq!(t.service().sensitivity().get(), 17_000);
}

#[test]
fn code_entry_telemetry_literal() {
    let e = TelemetryEvent::code_result(1_700_000_123, SafeState::Locked, false);
    assert_eq!(
        encode_telemetry(&e).unwrap(),
        br#"{"ts":1700000123,"state":"locked","event":"code_entry","code_ok":false}"#
    );
}

#[test]
fn failed_peripheral_init_leaves_control_running() {
    let channels: &'static Channels = Box::leak(Box::new(Channels::new()));

    let keypad = tasks::spawn_task(tasks::KEYPAD_TASK, || Err(Error::Init("gpio output"))).unwrap();
    assert!(keypad.join().is_ok());

    assert!(route_command(br#"{"command":"unlock"}"#, &channels.command));
    let control = tasks::spawn_task(tasks::CONTROL_TASK, move || {
        let mut t = task(MemNvs::new());
        let mut sink = RecordingSink::new();
        t.step(channels, &mut sink)?;
        assert_eq!(t.service().state(), SafeState::Unlocked);
        Ok(())
    })
    .unwrap();
    assert!(control.join().is_ok());
}
