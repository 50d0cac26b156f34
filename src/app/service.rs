//! Control service: the hexagonal core.
//!
//! [`ControlService`] owns the state machine, the PIN verifier, the
//! command processor and the keypad entry buffer.  It is driven by the
//! control task one input at a time; everything it produces leaves through
//! a [`ControlSink`].
//!
//! ```text
//!  KeyEvent ─────┐
//!  MotionEvent ──┼──▶ ┌──────────────────────────┐ ──▶ ControlSink
//!  RemoteCommand ┘    │ ControlService           │     (led, display,
//!                     │ FSM · PinVerifier · Cmd  │      telemetry)
//!                     └──────────────────────────┘
//! ```

use core::fmt::Write;
use std::sync::Arc;

use heapless::String;
use log::{debug, info, warn};

use crate::config::SystemConfig;
use crate::error::PinError;
use crate::fsm::{SafeEvent, SafeState, SafeStateMachine, Transition};
use crate::telemetry::TelemetryEvent;

use super::commands::RemoteCommand;
use super::events::{DisplayCommand, KeyAction, KeyEvent, LedCommand, MotionEvent};
use super::motion::Sensitivity;
use super::pin::{PIN_LENGTH, PinVerifier};
use super::ports::{ControlSink, StoragePort, TimePort};
use super::processor::{CommandProcessor, announce};

// ───────────────────────────────────────────────────────────────
// ControlService
// ───────────────────────────────────────────────────────────────

pub struct ControlService<S: StoragePort, C: TimePort> {
    machine: SafeStateMachine,
    pin: PinVerifier<S>,
    processor: CommandProcessor,
    clock: C,
    /// Digits typed since the last clear or submit.
    entry: String<PIN_LENGTH>,
    message_ms: u32,
}

impl<S: StoragePort, C: TimePort> ControlService<S, C> {
    /// Build the service.  Loads the PIN from `storage`, falling back to
    /// the configured default.
    pub fn new(
        config: &SystemConfig,
        storage: S,
        clock: C,
        sensitivity: Arc<Sensitivity>,
    ) -> Result<Self, PinError> {
        let pin = PinVerifier::load(storage, &config.default_pin)?;
        Ok(Self {
            machine: SafeStateMachine::from_config(config),
            pin,
            processor: CommandProcessor::new(sensitivity, config.message_duration_ms),
            clock,
            entry: String::new(),
            message_ms: config.message_duration_ms,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Publish the boot state to every output.
    pub fn start(&mut self, sink: &mut impl ControlSink) {
        let state = self.machine.state();
        sink.led(LedCommand { state });
        sink.display(DisplayCommand::ShowState(state));
        sink.telemetry(TelemetryEvent::state_change(self.clock.unix_secs(), state));
        info!("ControlService started in {}", state.as_str());
    }

    // ── Inputs ────────────────────────────────────────────────

    /// Feed one keypress into the PIN entry flow.
    pub fn handle_key(
        &mut self,
        key: KeyEvent,
        sink: &mut impl ControlSink,
    ) -> Result<Option<Transition>, PinError> {
        match key.action() {
            KeyAction::Digit(d) => {
                if self.entry.push(d).is_err() {
                    debug!("PIN entry full, digit ignored");
                    return Ok(None);
                }
                sink.display(DisplayCommand::PinEntry {
                    digits: self.entry.len() as u8,
                });
                Ok(None)
            }
            KeyAction::Clear => {
                self.entry.clear();
                sink.display(DisplayCommand::ShowState(self.machine.state()));
                Ok(None)
            }
            KeyAction::Submit => self.submit(sink),
            KeyAction::Function(c) => {
                debug!("Function key '{}' ignored", c);
                Ok(None)
            }
        }
    }

    /// A confirmed tamper movement.
    pub fn handle_motion(
        &mut self,
        motion: MotionEvent,
        sink: &mut impl ControlSink,
    ) -> Option<Transition> {
        let ts = self.clock.unix_secs();
        let before = self.machine.state();
        sink.telemetry(TelemetryEvent::movement(ts, before, motion.magnitude_g));

        let transition = self.machine.handle(SafeEvent::Motion);
        if let Some(t) = transition {
            warn!("Tamper movement ({:.2} g) while locked", motion.magnitude_g);
            self.entry.clear();
            announce(t, ts, sink);
        }
        transition
    }

    /// A decoded remote command.
    pub fn handle_command(
        &mut self,
        cmd: RemoteCommand,
        sink: &mut impl ControlSink,
    ) -> Option<Transition> {
        let ts = self.clock.unix_secs();
        let transition = self
            .processor
            .dispatch(cmd, &mut self.machine, &self.pin, ts, sink);
        if transition.is_some() {
            self.entry.clear();
        }
        transition
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> SafeState {
        self.machine.state()
    }

    pub fn wrong_count(&self) -> u8 {
        self.machine.wrong_count()
    }

    pub fn entry_len(&self) -> usize {
        self.entry.len()
    }

    pub fn sensitivity(&self) -> &Sensitivity {
        self.processor.sensitivity()
    }

    // ── Internal ──────────────────────────────────────────────

    fn submit(&mut self, sink: &mut impl ControlSink) -> Result<Option<Transition>, PinError> {
        if self.entry.is_empty() {
            debug!("Empty PIN submit ignored");
            return Ok(None);
        }
        sink.display(DisplayCommand::Checking);

        let ok = self.pin.verify(&self.entry);
        self.entry.clear();
        let ok = ok?;

        let ts = self.clock.unix_secs();
        let event = if ok {
            SafeEvent::CorrectPin
        } else {
            SafeEvent::WrongPin
        };
        let transition = self.machine.handle(event);
        let state = self.machine.state();
        info!("PIN {} in {}", if ok { "accepted" } else { "rejected" }, state.as_str());

        sink.telemetry(TelemetryEvent::code_result(ts, state, ok));
        match transition {
            Some(t) => announce(t, ts, sink),
            None if !ok => {
                let mut text: String<16> = String::new();
                if state == SafeState::Locked {
                    let _ = write!(
                        text,
                        "Wrong PIN {}/{}",
                        self.machine.wrong_count(),
                        self.machine.max_wrong_attempts()
                    );
                } else {
                    let _ = text.push_str("Wrong PIN");
                }
                sink.display(DisplayCommand::message(&text, self.message_ms, state));
            }
            None => sink.display(DisplayCommand::ShowState(state)),
        }
        Ok(transition)
    }
}
