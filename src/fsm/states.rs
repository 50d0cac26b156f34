//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers: no closures, no dynamic
//! dispatch, no heap.
//!
//! ```text
//!            ┌──[correct PIN]──▶ UNLOCKED ──[correct PIN]──┐
//!            │                                             ▼
//!  ──▶ LOCKED ◀─────────────────────────────────────────────┘
//!        │  ▲
//!        │  └──────────[correct PIN]────────┐
//!        │                                  │
//!        └──[motion | Nth wrong PIN]──▶ ALARM
//! ```

use super::context::FsmContext;
use super::{SafeEvent, SafeState, StateDescriptor};
use log::{info, warn};

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; SafeState::COUNT] {
    [
        // Index 0: Locked
        StateDescriptor {
            id: SafeState::Locked,
            name: "Locked",
            on_enter: Some(locked_enter),
            on_exit: None,
            on_event: locked_event,
        },
        // Index 1: Unlocked
        StateDescriptor {
            id: SafeState::Unlocked,
            name: "Unlocked",
            on_enter: Some(unlocked_enter),
            on_exit: None,
            on_event: unlocked_event,
        },
        // Index 2: Alarm
        StateDescriptor {
            id: SafeState::Alarm,
            name: "Alarm",
            on_enter: Some(alarm_enter),
            on_exit: Some(alarm_exit),
            on_event: alarm_event,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  LOCKED
// ═══════════════════════════════════════════════════════════════════════════

fn locked_enter(ctx: &mut FsmContext) {
    ctx.reset_wrong_count();
}

fn locked_event(ctx: &mut FsmContext, event: SafeEvent) -> Option<SafeState> {
    match event {
        SafeEvent::CorrectPin => Some(SafeState::Unlocked),
        SafeEvent::WrongPin => {
            if ctx.record_wrong_attempt() {
                warn!(
                    "Wrong PIN {}/{}: lockout threshold reached",
                    ctx.wrong_count, ctx.max_wrong_attempts
                );
                Some(SafeState::Alarm)
            } else {
                info!("Wrong PIN {}/{}", ctx.wrong_count, ctx.max_wrong_attempts);
                None
            }
        }
        SafeEvent::Motion => Some(SafeState::Alarm),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  UNLOCKED
// ═══════════════════════════════════════════════════════════════════════════

fn unlocked_enter(ctx: &mut FsmContext) {
    ctx.reset_wrong_count();
}

fn unlocked_event(_ctx: &mut FsmContext, event: SafeEvent) -> Option<SafeState> {
    match event {
        // Correct PIN toggles back to Locked.
        SafeEvent::CorrectPin => Some(SafeState::Locked),
        SafeEvent::WrongPin | SafeEvent::Motion => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  ALARM
// ═══════════════════════════════════════════════════════════════════════════

fn alarm_enter(ctx: &mut FsmContext) {
    warn!("ALARM raised (wrong_count={})", ctx.wrong_count);
}

fn alarm_exit(_ctx: &mut FsmContext) {
    info!("Alarm cleared");
}

fn alarm_event(_ctx: &mut FsmContext, event: SafeEvent) -> Option<SafeState> {
    match event {
        SafeEvent::CorrectPin => Some(SafeState::Locked),
        SafeEvent::WrongPin | SafeEvent::Motion => None,
    }
}
