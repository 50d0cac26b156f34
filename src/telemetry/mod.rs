//! Outbound telemetry: event type, delivery-tracking ring buffer, publisher.
//!
//! ```text
//!  control ──TelemetryEvent──▶ telemetry task ──▶ TelemetryPublisher
//!                                                  │  ring buffer (10)
//!                                                  ▼
//!                                             PublishPort (MQTT)
//!                                                  │ delivered(id)
//!  link events ◀────────────────────────────────────┘
//! ```

pub mod publisher;
pub mod ring;

pub use publisher::{PublisherConfig, TelemetryPublisher};
pub use ring::{BufferedEntry, TelemetryRingBuffer};

use crate::fsm::SafeState;

/// Ring buffer capacity used by the firmware.
pub const TELEMETRY_BUFFER_CAPACITY: usize = 10;

/// What a telemetry event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryKind {
    StateChange,
    Movement,
    CodeResult,
    CodeChanged,
}

impl TelemetryKind {
    /// Value of the `event` field on the wire.
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::StateChange => "state_change",
            Self::Movement => "movement",
            Self::CodeResult => "code_entry",
            Self::CodeChanged => "code_changed",
        }
    }
}

/// One immutable telemetry record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryEvent {
    pub kind: TelemetryKind,
    /// Unix seconds.
    pub timestamp: u32,
    pub state: SafeState,
    /// Present for [`TelemetryKind::Movement`].
    pub movement_amount: Option<f32>,
    /// Present for [`TelemetryKind::CodeResult`] and [`TelemetryKind::CodeChanged`].
    pub code_ok: Option<bool>,
}

impl TelemetryEvent {
    pub fn state_change(timestamp: u32, state: SafeState) -> Self {
        Self {
            kind: TelemetryKind::StateChange,
            timestamp,
            state,
            movement_amount: None,
            code_ok: None,
        }
    }

    pub fn movement(timestamp: u32, state: SafeState, magnitude_g: f32) -> Self {
        Self {
            kind: TelemetryKind::Movement,
            timestamp,
            state,
            movement_amount: Some(magnitude_g),
            code_ok: None,
        }
    }

    pub fn code_result(timestamp: u32, state: SafeState, ok: bool) -> Self {
        Self {
            kind: TelemetryKind::CodeResult,
            timestamp,
            state,
            movement_amount: None,
            code_ok: Some(ok),
        }
    }

    pub fn code_changed(timestamp: u32, state: SafeState, ok: bool) -> Self {
        Self {
            kind: TelemetryKind::CodeChanged,
            timestamp,
            state,
            movement_amount: None,
            code_ok: Some(ok),
        }
    }
}
