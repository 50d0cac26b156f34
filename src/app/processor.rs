//! Remote command dispatch.
//!
//! Lock, Unlock and ResetAlarm are gated on the current state by the
//! [`SafeStateMachine`]; SetCode goes to the [`PinVerifier`]; SetSensitivity
//! only touches the shared motion threshold.

use std::sync::Arc;

use log::{info, warn};

use super::commands::RemoteCommand;
use super::events::{DisplayCommand, LedCommand};
use super::motion::Sensitivity;
use super::pin::PinVerifier;
use super::ports::{ControlSink, StoragePort};
use crate::fsm::{SafeStateMachine, Transition};
use crate::telemetry::TelemetryEvent;

/// Push an accepted transition to every output: telemetry, LED, display.
pub fn announce(transition: Transition, ts: u32, sink: &mut impl ControlSink) {
    sink.telemetry(TelemetryEvent::state_change(ts, transition.to));
    sink.led(LedCommand {
        state: transition.to,
    });
    sink.display(DisplayCommand::ShowState(transition.to));
}

pub struct CommandProcessor {
    sensitivity: Arc<Sensitivity>,
    message_ms: u32,
}

impl CommandProcessor {
    pub fn new(sensitivity: Arc<Sensitivity>, message_ms: u32) -> Self {
        Self {
            sensitivity,
            message_ms,
        }
    }

    pub fn sensitivity(&self) -> &Sensitivity {
        &self.sensitivity
    }

    /// Apply one command.  Returns the transition it caused, if any.
    pub fn dispatch<S: StoragePort>(
        &self,
        cmd: RemoteCommand,
        machine: &mut SafeStateMachine,
        pin: &PinVerifier<S>,
        ts: u32,
        sink: &mut impl ControlSink,
    ) -> Option<Transition> {
        let name = cmd.name();
        let transition = match cmd {
            RemoteCommand::Lock => machine.remote_lock(),
            RemoteCommand::Unlock => machine.remote_unlock(),
            RemoteCommand::ResetAlarm => machine.reset_alarm(),
            RemoteCommand::SetCode(code) => {
                let ok = match pin.set(&code) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Command: set_code failed: {}", e);
                        false
                    }
                };
                let state = machine.state();
                sink.telemetry(TelemetryEvent::code_changed(ts, state, ok));
                let text = if ok { "Code changed" } else { "Code rejected" };
                sink.display(DisplayCommand::message(text, self.message_ms, state));
                return None;
            }
            RemoteCommand::SetSensitivity(raw) => {
                self.sensitivity.set(raw);
                return None;
            }
        };

        match transition {
            Some(t) => {
                info!("Command: '{}' accepted", name);
                announce(t, ts, sink);
            }
            None => info!("Command: '{}' ignored in state {}", name, machine.state().as_str()),
        }
        transition
    }
}
