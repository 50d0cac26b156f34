//! JSON wire format.
//!
//! Telemetry (published):
//! ```text
//! {"ts":1700000000,"state":"locked","event":"state_change"}
//! {"ts":1700000000,"state":"alarm","event":"movement","movement_amount":1.5}
//! {"ts":1700000000,"state":"unlocked","event":"code_entry","code_ok":true}
//! ```
//!
//! Commands (received):
//! ```text
//! {"command":"lock"}            {"command":"unlock"}
//! {"command":"reset_alarm"}     {"command":"set_code","code":"4321"}
//! {"command":"set_sensitivity","threshold":25000}
//! ```

use serde::Serialize;
use serde_json::Value;

use crate::app::commands::RemoteCommand;
use crate::app::pin::{self, PinCode};
use crate::error::ProtocolError;
use crate::fsm::SafeState;
use crate::telemetry::TelemetryEvent;

#[derive(Serialize)]
struct WireTelemetry {
    ts: u32,
    state: SafeState,
    event: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    movement_amount: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code_ok: Option<bool>,
}

/// Serialise one telemetry event.
pub fn encode_telemetry(event: &TelemetryEvent) -> Result<Vec<u8>, ProtocolError> {
    let wire = WireTelemetry {
        ts: event.timestamp,
        state: event.state,
        event: event.kind.wire_name(),
        movement_amount: event.movement_amount,
        code_ok: event.code_ok,
    };
    serde_json::to_vec(&wire).map_err(|_| ProtocolError::Encode)
}

/// Parse and shape-check an inbound command payload.
pub fn decode_command(payload: &[u8]) -> Result<RemoteCommand, ProtocolError> {
    let root: Value = serde_json::from_slice(payload).map_err(|_| ProtocolError::Malformed)?;
    let obj = root.as_object().ok_or(ProtocolError::Malformed)?;
    let tag = obj
        .get("command")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingCommand)?;

    match tag {
        "lock" => Ok(RemoteCommand::Lock),
        "unlock" => Ok(RemoteCommand::Unlock),
        "reset_alarm" => Ok(RemoteCommand::ResetAlarm),
        "set_code" => {
            let code = obj
                .get("code")
                .and_then(Value::as_str)
                .ok_or(ProtocolError::MissingField("code"))?;
            if !pin::validate(code) {
                return Err(ProtocolError::InvalidCode);
            }
            let mut pin = PinCode::new();
            pin.push_str(code).map_err(|_| ProtocolError::InvalidCode)?;
            Ok(RemoteCommand::SetCode(pin))
        }
        "set_sensitivity" => {
            let raw = obj
                .get("threshold")
                .and_then(Value::as_i64)
                .ok_or(ProtocolError::MissingField("threshold"))?;
            let threshold = raw.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
            Ok(RemoteCommand::SetSensitivity(threshold))
        }
        _ => Err(ProtocolError::UnknownCommand),
    }
}
