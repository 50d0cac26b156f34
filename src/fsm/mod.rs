//! Function-pointer finite state machine engine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  StateTable                                              │
//! │  ┌──────────┬───────────┬──────────┬──────────────────┐  │
//! │  │ State    │ on_enter  │ on_exit  │ on_event         │  │
//! │  ├──────────┼───────────┼──────────┼──────────────────┤  │
//! │  │ Locked   │ fn(ctx)   │    -     │ fn(ctx,ev)->Opt  │  │
//! │  │ Unlocked │ fn(ctx)   │    -     │ fn(ctx,ev)->Opt  │  │
//! │  │ Alarm    │ fn(ctx)   │ fn(ctx)  │ fn(ctx,ev)->Opt  │  │
//! │  └──────────┴───────────┴──────────┴──────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Each input event is handed to `on_event` of the **current** state.
//! If it returns `Some(next)`, the engine runs `on_exit` for the current
//! state, then `on_enter` for the next, and updates the current pointer.
//! Remote commands bypass `on_event` through [`Fsm::force_transition`].

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;
use serde::{Deserialize, Serialize};

use crate::config::SystemConfig;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// The safe's lock state.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum SafeState {
    Locked = 0,
    Unlocked = 1,
    Alarm = 2,
}

impl SafeState {
    /// Total number of states, sizes the table array.
    pub const COUNT: usize = 3;

    /// Convert an index back to `SafeState`.  Asserts in debug builds;
    /// returns `Locked` in release (the secure fallback).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Locked,
            1 => Self::Unlocked,
            2 => Self::Alarm,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Locked
            }
        }
    }

    /// Wire name used in telemetry.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
            Self::Alarm => "alarm",
        }
    }
}

/// Inputs the state table reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafeEvent {
    CorrectPin,
    WrongPin,
    Motion,
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut FsmContext);

/// Signature for the per-event handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateEventFn = fn(&mut FsmContext, SafeEvent) -> Option<SafeState>;

/// Static descriptor for a single FSM state.
pub struct StateDescriptor {
    pub id: SafeState,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_event: StateEventFn,
}

/// A completed state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: SafeState,
    pub to: SafeState,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
pub struct Fsm {
    /// Fixed-size table indexed by `SafeState as usize`.
    table: [StateDescriptor; SafeState::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Number of transitions taken since start.
    transitions: u32,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; SafeState::COUNT], initial: SafeState) -> Self {
        Self {
            table,
            current: initial as usize,
            transitions: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Feed one event to the current state's handler.
    pub fn handle(&mut self, event: SafeEvent, ctx: &mut FsmContext) -> Option<Transition> {
        let next = (self.table[self.current].on_event)(ctx, event)?;
        Some(self.transition(next, ctx))
    }

    /// Jump to `next` without consulting `on_event`.  A no-op when already
    /// there.
    pub fn force_transition(&mut self, next: SafeState, ctx: &mut FsmContext) -> Option<Transition> {
        if next as usize == self.current {
            return None;
        }
        Some(self.transition(next, ctx))
    }

    pub fn current_state(&self) -> SafeState {
        SafeState::from_index(self.current)
    }

    pub fn transition_count(&self) -> u32 {
        self.transitions
    }

    fn transition(&mut self, next: SafeState, ctx: &mut FsmContext) -> Transition {
        let from = self.current_state();
        let next_idx = next as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.transitions = self.transitions.wrapping_add(1);

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }

        Transition { from, to: next }
    }
}

// ---------------------------------------------------------------------------
// Safe state machine (engine + context)
// ---------------------------------------------------------------------------

/// The authoritative lock/unlock/alarm state together with its counter.
///
/// Owned by the control task only.  PIN events go through the table;
/// remote commands are gated on the source state here and then forced.
pub struct SafeStateMachine {
    fsm: Fsm,
    ctx: FsmContext,
}

impl SafeStateMachine {
    /// Start in Locked with the given lockout threshold.
    pub fn new(max_wrong_attempts: u8) -> Self {
        let mut ctx = FsmContext::new(max_wrong_attempts);
        let mut fsm = Fsm::new(states::build_state_table(), SafeState::Locked);
        fsm.start(&mut ctx);
        Self { fsm, ctx }
    }

    pub fn from_config(config: &SystemConfig) -> Self {
        Self::new(config.max_wrong_attempts)
    }

    pub fn state(&self) -> SafeState {
        self.fsm.current_state()
    }

    pub fn wrong_count(&self) -> u8 {
        self.ctx.wrong_count
    }

    pub fn max_wrong_attempts(&self) -> u8 {
        self.ctx.max_wrong_attempts
    }

    pub fn handle(&mut self, event: SafeEvent) -> Option<Transition> {
        self.fsm.handle(event, &mut self.ctx)
    }

    /// Remote lock: only from Unlocked.
    pub fn remote_lock(&mut self) -> Option<Transition> {
        self.force_from(SafeState::Unlocked, SafeState::Locked)
    }

    /// Remote unlock: only from Locked.
    pub fn remote_unlock(&mut self) -> Option<Transition> {
        self.force_from(SafeState::Locked, SafeState::Unlocked)
    }

    /// Remote alarm reset: only from Alarm; lands in Locked with a cleared
    /// counter.
    pub fn reset_alarm(&mut self) -> Option<Transition> {
        self.force_from(SafeState::Alarm, SafeState::Locked)
    }

    fn force_from(&mut self, required: SafeState, next: SafeState) -> Option<Transition> {
        if self.state() != required {
            return None;
        }
        self.fsm.force_transition(next, &mut self.ctx)
    }
}
