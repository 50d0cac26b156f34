//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` carries the wrong-PIN counter and the lockout threshold.
//! Handlers read and write it; nothing else does.

use crate::config::SystemConfig;

/// Blackboard for the safe's state handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsmContext {
    /// Consecutive wrong PINs entered while Locked since the last reset.
    pub wrong_count: u8,
    /// `wrong_count` value that trips the alarm.
    pub max_wrong_attempts: u8,
}

impl FsmContext {
    pub fn new(max_wrong_attempts: u8) -> Self {
        Self {
            wrong_count: 0,
            // A zero threshold would alarm on every state entry.
            max_wrong_attempts: max_wrong_attempts.max(1),
        }
    }

    pub fn from_config(config: &SystemConfig) -> Self {
        Self::new(config.max_wrong_attempts)
    }

    /// Count one wrong attempt; `true` once the threshold is reached.
    pub fn record_wrong_attempt(&mut self) -> bool {
        self.wrong_count = self.wrong_count.saturating_add(1);
        self.wrong_count >= self.max_wrong_attempts
    }

    pub fn reset_wrong_count(&mut self) {
        self.wrong_count = 0;
    }
}
