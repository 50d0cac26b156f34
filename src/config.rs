//! System configuration parameters
//!
//! All tunable parameters for the smart safe.
//! Values can be overridden via NVS (non-volatile storage).

use core::fmt::Write;

use heapless::String;
use serde::{Deserialize, Serialize};

/// Longest topic we build: prefix + '/' + device id + "/telemetry".
pub type Topic = String<80>;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Identity / link ---
    /// Device identifier, second topic segment
    pub device_id: String<32>,
    /// Topic namespace root
    pub topic_prefix: String<32>,
    /// MQTT broker URI
    pub broker_uri: String<96>,

    // --- Access control ---
    /// PIN used when NVS holds none
    pub default_pin: String<7>,
    /// Wrong attempts while Locked before the alarm trips
    pub max_wrong_attempts: u8,

    // --- Tamper sensing ---
    /// Initial accelerometer magnitude threshold (raw LSB, ±2g range)
    pub movement_threshold: i32,

    // --- Output rendering ---
    /// Lifetime of transient display messages (milliseconds)
    pub message_duration_ms: u32,
    /// LED half-period while in Alarm (milliseconds)
    pub alarm_flash_interval_ms: u32,

    // --- Telemetry delivery ---
    /// A pending entry older than this is republished (milliseconds)
    pub ack_timeout_ms: u32,
    /// Period of the pending-entry sweep (milliseconds)
    pub sweep_interval_ms: u32,
    /// Spacing between backlog republishes after reconnect (milliseconds)
    pub flush_spacing_ms: u32,

    // --- Timing ---
    /// Control loop idle wait (milliseconds)
    pub control_poll_ms: u32,
    /// Task watchdog deadline (milliseconds)
    pub watchdog_timeout_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            device_id: fixed("smartsafe01"),
            topic_prefix: fixed("smartsafe"),
            broker_uri: fixed("mqtt://localhost:1883"),

            default_pin: fixed("1234"),
            max_wrong_attempts: 3,

            movement_threshold: 20_000, // ~1.22 g

            message_duration_ms: 2_000,
            alarm_flash_interval_ms: 500,

            ack_timeout_ms: 10_000,
            sweep_interval_ms: 2_000,
            flush_spacing_ms: 100,

            control_poll_ms: 10,
            watchdog_timeout_ms: 10_000,
        }
    }
}

impl SystemConfig {
    /// `<prefix>/<device_id>/telemetry`
    pub fn telemetry_topic(&self) -> Topic {
        self.topic("telemetry")
    }

    /// `<prefix>/<device_id>/command`
    pub fn command_topic(&self) -> Topic {
        self.topic("command")
    }

    fn topic(&self, leaf: &str) -> Topic {
        let mut t = Topic::new();
        // Capacity covers the maximum prefix and id lengths.
        let _ = write!(t, "{}/{}/{}", self.topic_prefix, self.device_id, leaf);
        t
    }
}

/// Build a fixed-capacity string from a literal, truncating on overflow.
fn fixed<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
