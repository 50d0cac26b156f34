//! Red/green status LEDs.
//!
//! | State    | Red        | Green |
//! |----------|------------|-------|
//! | Locked   | on         | off   |
//! | Unlocked | off        | on    |
//! | Alarm    | flashing   | off   |

use embedded_hal::digital::{OutputPin, PinState};

use crate::app::ports::Tick;
use crate::error::BusError;
use crate::fsm::SafeState;

pub struct LedIndicator<R, G> {
    red: R,
    green: G,
    state: SafeState,
    flash_interval_ms: u32,
    flash_on: bool,
    last_toggle: Tick,
}

impl<R: OutputPin, G: OutputPin> LedIndicator<R, G> {
    pub fn new(red: R, green: G, flash_interval_ms: u32) -> Self {
        Self {
            red,
            green,
            state: SafeState::Locked,
            flash_interval_ms,
            flash_on: false,
            last_toggle: 0,
        }
    }

    pub fn state(&self) -> SafeState {
        self.state
    }

    /// Switch to the pattern for `state`.
    pub fn apply(&mut self, state: SafeState, now: Tick) -> Result<(), BusError> {
        self.state = state;
        self.last_toggle = now;
        self.flash_on = true;
        match state {
            SafeState::Locked | SafeState::Alarm => self.set(true, false),
            SafeState::Unlocked => self.set(false, true),
        }
    }

    /// Advance the alarm flash.  A no-op outside Alarm.
    pub fn tick(&mut self, now: Tick) -> Result<(), BusError> {
        if self.state != SafeState::Alarm
            || now.wrapping_sub(self.last_toggle) < self.flash_interval_ms
        {
            return Ok(());
        }
        self.last_toggle = now;
        self.flash_on = !self.flash_on;
        self.set(self.flash_on, false)
    }

    fn set(&mut self, red: bool, green: bool) -> Result<(), BusError> {
        self.red
            .set_state(PinState::from(red))
            .map_err(|_| BusError::Gpio)?;
        self.green
            .set_state(PinState::from(green))
            .map_err(|_| BusError::Gpio)
    }
}
