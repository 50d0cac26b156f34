//! Unified error types for the smart safe firmware.
//!
//! Every subsystem error converts into the top-level [`Error`], so a task
//! loop can bubble failures up with `?` and let the spawn wrapper log them.
//! All variants are `Copy` so they travel through channels and logs without
//! allocation.

use core::fmt;

use crate::app::ports::StorageError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// PIN verification or update failed.
    Pin(PinError),
    /// The shared I2C bus or a peripheral on it failed.
    Bus(BusError),
    /// A wire payload could not be encoded or decoded.
    Protocol(ProtocolError),
    /// The telemetry publisher could not make progress.
    Telemetry(TelemetryError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pin(e) => write!(f, "pin: {e}"),
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Protocol(e) => write!(f, "protocol: {e}"),
            Self::Telemetry(e) => write!(f, "telemetry: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// PIN errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinError {
    /// Candidate is not exactly four ASCII digits.
    InvalidFormat,
    /// Persisting the new PIN failed; the old PIN stays active.
    Storage(StorageError),
    /// The PIN mutex was poisoned by a panicking holder.
    LockPoisoned,
}

impl fmt::Display for PinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat => write!(f, "PIN must be 4 digits"),
            Self::Storage(e) => write!(f, "PIN not persisted: {e}"),
            Self::LockPoisoned => write!(f, "PIN lock poisoned"),
        }
    }
}

impl std::error::Error for PinError {}

impl From<PinError> for Error {
    fn from(e: PinError) -> Self {
        Self::Pin(e)
    }
}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// An I2C transaction failed or timed out.
    Transfer,
    /// The device answered with an unexpected identity.
    WrongDevice(u8),
    /// The bus mutex was poisoned by a panicking holder.
    LockPoisoned,
    /// A GPIO read or write failed.
    Gpio,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transfer => write!(f, "I2C transfer failed"),
            Self::WrongDevice(id) => write!(f, "unexpected device id 0x{id:02X}"),
            Self::LockPoisoned => write!(f, "bus lock poisoned"),
            Self::Gpio => write!(f, "GPIO access failed"),
        }
    }
}

impl std::error::Error for BusError {}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Wire protocol errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Payload is not a JSON object of the expected shape.
    Malformed,
    /// The `command` field is absent or not a string.
    MissingCommand,
    /// The `command` tag is not one we understand.
    UnknownCommand,
    /// A command-specific field is missing.
    MissingField(&'static str),
    /// `set_code` carried something other than four digits.
    InvalidCode,
    /// Serialising an outbound payload failed.
    Encode,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed payload"),
            Self::MissingCommand => write!(f, "missing 'command' field"),
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::MissingField(name) => write!(f, "missing '{name}' field"),
            Self::InvalidCode => write!(f, "code must be 4 digits"),
            Self::Encode => write!(f, "encoding failed"),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

// ---------------------------------------------------------------------------
// Telemetry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryError {
    /// The ring buffer mutex was poisoned by a panicking holder.
    LockPoisoned,
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LockPoisoned => write!(f, "ring buffer lock poisoned"),
        }
    }
}

impl std::error::Error for TelemetryError {}

impl From<TelemetryError> for Error {
    fn from(e: TelemetryError) -> Self {
        Self::Telemetry(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
