//! Control path: keypad / motion / commands → ControlService → sink.

use std::sync::Arc;

use smartsafe::app::commands::RemoteCommand;
use smartsafe::app::events::{DisplayCommand, KeyEvent, LedCommand, MotionEvent};
use smartsafe::app::motion::Sensitivity;
use smartsafe::app::pin::{PIN_KEY, PIN_NAMESPACE, PinCode};
use smartsafe::app::service::ControlService;
use smartsafe::config::SystemConfig;
use smartsafe::fsm::SafeState;
use smartsafe::telemetry::TelemetryKind;

use super::mocks::{ManualClock, MemNvs, RecordingSink};

type Service = ControlService<MemNvs, ManualClock>;

fn service_with(nvs: MemNvs) -> (Service, RecordingSink) {
    let svc = ControlService::new(
        &SystemConfig::default(),
        nvs,
        ManualClock::new(0),
        Arc::new(Sensitivity::default()),
    )
    .unwrap();
    (svc, RecordingSink::new())
}

fn enter(svc: &mut Service, sink: &mut RecordingSink, keys: &str) {
    for c in keys.chars() {
        svc.handle_key(KeyEvent::new(c).unwrap(), sink).unwrap();
    }
}

fn code(pin: &str) -> PinCode {
    let mut c = PinCode::new();
    c.push_str(pin).unwrap();
    c
}

// ── Scenario A: correct PIN unlocks ──────────────────────────

#[test]
fn scenario_a_correct_pin_unlocks() {
    let (mut svc, mut sink) = service_with(MemNvs::new());
    enter(&mut svc, &mut sink, "1234#");

    assert_eq!(svc.state(), SafeState::Unlocked);
    assert_eq!(svc.wrong_count(), 0);

    let changes = sink.of_kind(TelemetryKind::StateChange);
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].state, SafeState::Unlocked);

    let results = sink.of_kind(TelemetryKind::CodeResult);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].code_ok, Some(true));

    assert_eq!(sink.leds, [LedCommand { state: SafeState::Unlocked }]);
    assert_eq!(
        sink.displays.last(),
        Some(&DisplayCommand::ShowState(SafeState::Unlocked))
    );
}

// ── Scenario B: three wrong PINs trip the alarm ──────────────

#[test]
fn scenario_b_three_wrong_pins_alarm() {
    let (mut svc, mut sink) = service_with(MemNvs::new());
    enter(&mut svc, &mut sink, "1111#");
    enter(&mut svc, &mut sink, "2222#");
    assert_eq!(svc.state(), SafeState::Locked);
    assert_eq!(svc.wrong_count(), 2);
    enter(&mut svc, &mut sink, "3333#");

    assert_eq!(svc.state(), SafeState::Alarm);

    let changes = sink.of_kind(TelemetryKind::StateChange);
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].state, SafeState::Alarm);

    let results = sink.of_kind(TelemetryKind::CodeResult);
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|e| e.code_ok == Some(false)));
    assert_eq!(sink.leds, [LedCommand { state: SafeState::Alarm }]);
}

#[test]
fn wrong_pin_shows_attempt_counter() {
    let (mut svc, mut sink) = service_with(MemNvs::new());
    enter(&mut svc, &mut sink, "9999#");
    assert_eq!(
        sink.displays.last(),
        Some(&DisplayCommand::message("Wrong PIN 1/3", 2_000, SafeState::Locked))
    );
}

#[test]
fn correct_pin_resets_wrong_count() {
    let (mut svc, mut sink) = service_with(MemNvs::new());
    enter(&mut svc, &mut sink, "0000#");
    enter(&mut svc, &mut sink, "0000#");
    enter(&mut svc, &mut sink, "1234#");
    assert_eq!(svc.state(), SafeState::Unlocked);
    assert_eq!(svc.wrong_count(), 0);

    // Toggle back and start counting afresh.
    enter(&mut svc, &mut sink, "1234#");
    enter(&mut svc, &mut sink, "0000#");
    enter(&mut svc, &mut sink, "0000#");
    assert_eq!(svc.state(), SafeState::Locked);
}

#[test]
fn wrong_pins_while_unlocked_do_not_count() {
    let (mut svc, mut sink) = service_with(MemNvs::new());
    enter(&mut svc, &mut sink, "1234#");
    for _ in 0..5 {
        enter(&mut svc, &mut sink, "0000#");
    }
    assert_eq!(svc.state(), SafeState::Unlocked);
    assert_eq!(svc.wrong_count(), 0);
}

#[test]
fn clear_key_discards_partial_entry() {
    let (mut svc, mut sink) = service_with(MemNvs::new());
    enter(&mut svc, &mut sink, "12*1234#");
    assert_eq!(svc.state(), SafeState::Unlocked);
}

#[test]
fn fifth_digit_and_function_keys_are_ignored() {
    let (mut svc, mut sink) = service_with(MemNvs::new());
    enter(&mut svc, &mut sink, "1A23B45");
    assert_eq!(svc.entry_len(), 4);
    enter(&mut svc, &mut sink, "#");
    assert_eq!(svc.state(), SafeState::Unlocked);
}

#[test]
fn empty_submit_emits_nothing() {
    let (mut svc, mut sink) = service_with(MemNvs::new());
    enter(&mut svc, &mut sink, "#");
    assert!(sink.telemetry.is_empty());
    assert!(sink.displays.is_empty());
}

#[test]
fn stored_pin_wins_over_default() {
    let (mut svc, mut sink) = service_with(MemNvs::with(PIN_NAMESPACE, PIN_KEY, b"8642"));
    enter(&mut svc, &mut sink, "1234#");
    assert_eq!(svc.state(), SafeState::Locked);
    enter(&mut svc, &mut sink, "8642#");
    assert_eq!(svc.state(), SafeState::Unlocked);
}

// ── Motion ────────────────────────────────────────────────────

#[test]
fn motion_while_locked_alarms() {
    let (mut svc, mut sink) = service_with(MemNvs::new());
    svc.handle_motion(MotionEvent { magnitude_g: 1.8 }, &mut sink);

    assert_eq!(svc.state(), SafeState::Alarm);
    let movement = sink.of_kind(TelemetryKind::Movement);
    assert_eq!(movement.len(), 1);
    assert_eq!(movement[0].movement_amount, Some(1.8));
    assert_eq!(sink.of_kind(TelemetryKind::StateChange)[0].state, SafeState::Alarm);
}

#[test]
fn motion_while_unlocked_is_reported_not_acted_on() {
    let (mut svc, mut sink) = service_with(MemNvs::new());
    enter(&mut svc, &mut sink, "1234#");
    sink.clear();
    svc.handle_motion(MotionEvent { magnitude_g: 1.5 }, &mut sink);
    assert_eq!(svc.state(), SafeState::Unlocked);
    assert_eq!(sink.of_kind(TelemetryKind::Movement).len(), 1);
    assert!(sink.of_kind(TelemetryKind::StateChange).is_empty());
}

#[test]
fn correct_pin_clears_alarm() {
    let (mut svc, mut sink) = service_with(MemNvs::new());
    svc.handle_motion(MotionEvent { magnitude_g: 2.0 }, &mut sink);
    enter(&mut svc, &mut sink, "1234#");
    assert_eq!(svc.state(), SafeState::Locked);
}

// ── Remote commands ───────────────────────────────────────────

#[test]
fn remote_commands_are_state_gated() {
    let (mut svc, mut sink) = service_with(MemNvs::new());
    assert!(svc.handle_command(RemoteCommand::Lock, &mut sink).is_none());
    assert!(svc.handle_command(RemoteCommand::ResetAlarm, &mut sink).is_none());
    assert!(sink.telemetry.is_empty());

    assert!(svc.handle_command(RemoteCommand::Unlock, &mut sink).is_some());
    assert_eq!(svc.state(), SafeState::Unlocked);
    assert!(svc.handle_command(RemoteCommand::Unlock, &mut sink).is_none());
    assert!(svc.handle_command(RemoteCommand::Lock, &mut sink).is_some());
    assert_eq!(svc.state(), SafeState::Locked);
    assert_eq!(sink.of_kind(TelemetryKind::StateChange).len(), 2);
}

#[test]
fn reset_alarm_clears_wrong_count() {
    let (mut svc, mut sink) = service_with(MemNvs::new());
    enter(&mut svc, &mut sink, "0000#0000#0000#");
    assert_eq!(svc.state(), SafeState::Alarm);
    svc.handle_command(RemoteCommand::ResetAlarm, &mut sink);
    assert_eq!(svc.state(), SafeState::Locked);
    assert_eq!(svc.wrong_count(), 0);
}

#[test]
fn set_code_persists_then_applies() {
    let nvs = MemNvs::new();
    let (mut svc, mut sink) = service_with(nvs.clone());
    svc.handle_command(RemoteCommand::SetCode(code("5555")), &mut sink);

    assert_eq!(nvs.get(PIN_NAMESPACE, PIN_KEY).as_deref(), Some(&b"5555"[..]));
    let changed = sink.of_kind(TelemetryKind::CodeChanged);
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].code_ok, Some(true));

    enter(&mut svc, &mut sink, "1234#");
    assert_eq!(svc.state(), SafeState::Locked);
    enter(&mut svc, &mut sink, "5555#");
    assert_eq!(svc.state(), SafeState::Unlocked);
}

#[test]
fn set_code_storage_failure_keeps_old_pin() {
    let nvs = MemNvs::new();
    nvs.fail_writes(true);
    let (mut svc, mut sink) = service_with(nvs.clone());
    svc.handle_command(RemoteCommand::SetCode(code("5555")), &mut sink);

    assert_eq!(nvs.get(PIN_NAMESPACE, PIN_KEY), None);
    assert_eq!(sink.of_kind(TelemetryKind::CodeChanged)[0].code_ok, Some(false));
    assert_eq!(
        sink.displays.last(),
        Some(&DisplayCommand::message("Code rejected", 2_000, SafeState::Locked))
    );

    enter(&mut svc, &mut sink, "1234#");
    assert_eq!(svc.state(), SafeState::Unlocked);
}

#[test]
fn set_sensitivity_clamps_shared_threshold() {
    let (mut svc, mut sink) = service_with(MemNvs::new());
    svc.handle_command(RemoteCommand::SetSensitivity(99_999), &mut sink);
    assert_eq!(svc.sensitivity().get(), 45_000);
    svc.handle_command(RemoteCommand::SetSensitivity(1), &mut sink);
    assert_eq!(svc.sensitivity().get(), 17_000);
    assert!(sink.telemetry.is_empty());
    assert_eq!(svc.state(), SafeState::Locked);
}
