//! Inbound remote commands.
//!
//! Decoded from the command topic by [`crate::link::codec`] and consumed by
//! the [`CommandProcessor`](super::processor::CommandProcessor) on the
//! control task.

use super::pin::PinCode;

/// Commands the remote link can send into the control core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    /// Unlocked → Locked.
    Lock,
    /// Locked → Unlocked, bypassing PIN entry.
    Unlock,
    /// Replace the PIN (already shape-checked by the decoder).
    SetCode(PinCode),
    /// Alarm → Locked, clearing the wrong-attempt counter.
    ResetAlarm,
    /// Adjust the tamper threshold; clamped before use.
    SetSensitivity(i32),
}

impl RemoteCommand {
    /// Wire tag, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::SetCode(_) => "set_code",
            Self::ResetAlarm => "reset_alarm",
            Self::SetSensitivity(_) => "set_sensitivity",
        }
    }
}
