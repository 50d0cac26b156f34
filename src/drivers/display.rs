//! Display controller: turns [`DisplayCommand`]s into screen writes and
//! runs the one-shot timer that reverts transient messages.
//!
//! The timer never writes to the screen itself.  [`DisplayController::poll`]
//! hands back a `Restore` command which the display task enqueues on its
//! own channel; a `Restore` whose generation is stale (a newer message or
//! a PIN entry arrived meanwhile) is ignored.

use heapless::String;
use log::debug;

use crate::app::events::DisplayCommand;
use crate::app::pin::PIN_LENGTH;
use crate::app::ports::Tick;
use crate::error::BusError;
use crate::fsm::SafeState;

pub const ROW_WIDTH: usize = 16;

pub type Rgb = (u8, u8, u8);

pub const RED: Rgb = (255, 0, 0);
pub const GREEN: Rgb = (0, 255, 0);

/// A two-row character display with an RGB backlight.
pub trait CharDisplay {
    /// Write `text` to `row` (0 or 1), padding the rest of the row.
    fn write_row(&mut self, row: u8, text: &str) -> Result<(), BusError>;
    fn set_backlight(&mut self, rgb: Rgb) -> Result<(), BusError>;
}

/// Rows and backlight colour of the screen shown for a state.
pub fn state_screen(state: SafeState) -> (&'static str, &'static str, Rgb) {
    match state {
        SafeState::Locked => ("Status: LOCKED", "Ready", RED),
        SafeState::Unlocked => ("Status: UNLOCKED", "Access Granted", GREEN),
        SafeState::Alarm => ("!! ALARM !!", "Tamper Detected", RED),
    }
}

#[derive(Debug, Clone, Copy)]
struct RestoreTimer {
    armed_at: Tick,
    duration_ms: u32,
    state: SafeState,
}

pub struct DisplayController<D> {
    display: D,
    generation: u32,
    timer: Option<RestoreTimer>,
}

impl<D: CharDisplay> DisplayController<D> {
    pub fn new(display: D) -> Self {
        Self {
            display,
            generation: 0,
            timer: None,
        }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn apply(&mut self, cmd: DisplayCommand, now: Tick) -> Result<(), BusError> {
        match cmd {
            DisplayCommand::ShowState(state) => {
                self.cancel_restore();
                self.render_state(state)
            }
            DisplayCommand::PinEntry { digits } => {
                self.cancel_restore();
                let mut row: String<ROW_WIDTH> = String::new();
                let _ = row.push_str("PIN: ");
                for _ in 0..usize::from(digits).min(PIN_LENGTH) {
                    let _ = row.push('*');
                }
                self.display.write_row(0, "Enter PIN")?;
                self.display.write_row(1, &row)
            }
            DisplayCommand::Checking => {
                self.cancel_restore();
                self.display.write_row(1, "Checking...")
            }
            DisplayCommand::Message {
                text,
                duration_ms,
                restore,
            } => {
                self.generation = self.generation.wrapping_add(1);
                self.timer = Some(RestoreTimer {
                    armed_at: now,
                    duration_ms,
                    state: restore,
                });
                self.display.write_row(1, &text)
            }
            DisplayCommand::Restore { state, generation } => {
                if generation != self.generation {
                    debug!(
                        "Display: stale restore (gen {} != {}) ignored",
                        generation, self.generation
                    );
                    return Ok(());
                }
                self.render_state(state)
            }
        }
    }

    /// Fire the message timer if it is due.
    pub fn poll(&mut self, now: Tick) -> Option<DisplayCommand> {
        let timer = self.timer?;
        if now.wrapping_sub(timer.armed_at) < timer.duration_ms {
            return None;
        }
        self.timer = None;
        Some(DisplayCommand::Restore {
            state: timer.state,
            generation: self.generation,
        })
    }

    /// Also invalidates a `Restore` already sitting in the channel.
    fn cancel_restore(&mut self) {
        self.timer = None;
        self.generation = self.generation.wrapping_add(1);
    }

    fn render_state(&mut self, state: SafeState) -> Result<(), BusError> {
        let (top, bottom, rgb) = state_screen(state);
        self.display.set_backlight(rgb)?;
        self.display.write_row(0, top)?;
        self.display.write_row(1, bottom)
    }
}
