//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlService (domain)
//! ```
//!
//! Driven adapters (storage, clocks, output channels) implement these
//! traits.  The [`ControlService`](super::service::ControlService) consumes
//! them via generics, so the domain core never touches hardware directly.
//! The outbound publish port lives with the link layer in
//! [`crate::link::transport`].
//!
//! ## Security notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - **StoragePort** holds the PIN; implementations SHOULD use the
//!   encrypted NVS partition on target.

use crate::config::SystemConfig;
use crate::telemetry::TelemetryEvent;

use super::events::{DisplayCommand, LedCommand};

// ───────────────────────────────────────────────────────────────
// Control sink (driven adapter: domain → output channels)
// ───────────────────────────────────────────────────────────────

/// Where the control task sends everything it produces.
///
/// The production adapter pushes onto the LED, display and telemetry
/// channels; tests record the calls.
pub trait ControlSink {
    fn led(&mut self, command: LedCommand);
    fn display(&mut self, command: DisplayCommand);
    fn telemetry(&mut self, event: TelemetryEvent);
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic milliseconds since boot.  Wraps at `u32::MAX` (~49.7 days);
/// compare with `wrapping_sub`.
pub type Tick = u32;

/// Clock queries used by the domain and the telemetry publisher.
pub trait TimePort {
    /// Monotonic tick in milliseconds.
    fn now_ms(&self) -> Tick;

    /// Wall clock in Unix seconds for telemetry timestamps.  Falls back to
    /// uptime seconds when the clock has not been synchronised.
    fn unix_secs(&self) -> u32;
}

impl<T: TimePort + ?Sized> TimePort for &T {
    fn now_ms(&self) -> Tick {
        (**self).now_ms()
    }

    fn unix_secs(&self) -> u32 {
        (**self).unix_secs()
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage.
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Write operations MUST be atomic, with no partial writes on power loss.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
