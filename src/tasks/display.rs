//! Display task.
//!
//! The restore timer never touches the screen itself: when it fires, a
//! `Restore` goes back through the display channel and is applied like any
//! other command, so a newer state screen always wins.

use core::time::Duration;

use log::warn;

use crate::app::ports::TimePort;
use crate::channels::{Channels, recv_timeout, send_or_drop};
use crate::drivers::display::{CharDisplay, DisplayController};
use crate::error::Result;

pub const DISPLAY_WAIT: Duration = Duration::from_millis(100);

pub fn step<D: CharDisplay>(
    display: &mut DisplayController<D>,
    channels: &Channels,
    clock: &impl TimePort,
) {
    if let Some(cmd) = recv_timeout(&channels.display, DISPLAY_WAIT) {
        if let Err(e) = display.apply(cmd, clock.now_ms()) {
            warn!("Display: {}", e);
        }
    }
    if let Some(restore) = display.poll(clock.now_ms()) {
        send_or_drop(&channels.display, restore, "display");
    }
}

pub fn run<D: CharDisplay>(
    mut display: DisplayController<D>,
    channels: &Channels,
    clock: impl TimePort,
) -> Result<()> {
    loop {
        step(&mut display, channels, &clock);
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use core::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::app::events::DisplayCommand;
    use crate::app::ports::Tick;
    use crate::drivers::display::Rgb;
    use crate::error::BusError;
    use crate::fsm::SafeState;

    #[derive(Default)]
    struct Screen {
        rows: [String; 2],
    }

    impl CharDisplay for Screen {
        fn write_row(&mut self, row: u8, text: &str) -> core::result::Result<(), BusError> {
            self.rows[usize::from(row)] = text.into();
            Ok(())
        }

        fn set_backlight(&mut self, _rgb: Rgb) -> core::result::Result<(), BusError> {
            Ok(())
        }
    }

    struct ManualClock(Rc<Cell<Tick>>);

    impl TimePort for ManualClock {
        fn now_ms(&self) -> Tick {
            self.0.get()
        }

        fn unix_secs(&self) -> u32 {
            0
        }
    }

    #[test]
    fn message_reverts_through_the_channel() {
        let channels = Channels::new();
        let now = Rc::new(Cell::new(0));
        let clock = ManualClock(now.clone());
        let mut display = DisplayController::new(Screen::default());

        send_or_drop(
            &channels.display,
            DisplayCommand::message("Wrong PIN 1/3", 2_000, SafeState::Locked),
            "display",
        );
        step(&mut display, &channels, &clock);
        assert_eq!(display.display().rows[1], "Wrong PIN 1/3");

        now.set(2_000);
        step(&mut display, &channels, &clock);
        // The restore is queued, not yet drawn.
        assert_eq!(display.display().rows[1], "Wrong PIN 1/3");
        step(&mut display, &channels, &clock);
        assert_eq!(display.display().rows[0], "Status: LOCKED");
        assert_eq!(display.display().rows[1], "Ready");
    }

    #[test]
    fn newer_state_beats_queued_restore() {
        let channels = Channels::new();
        let now = Rc::new(Cell::new(0));
        let clock = ManualClock(now.clone());
        let mut display = DisplayController::new(Screen::default());

        display
            .apply(DisplayCommand::message("Code changed", 2_000, SafeState::Locked), 0)
            .unwrap();
        // Control publishes a new state just as the timer fires behind it.
        send_or_drop(&channels.display, DisplayCommand::ShowState(SafeState::Unlocked), "display");
        let restore = display.poll(2_000).unwrap();
        send_or_drop(&channels.display, restore, "display");

        now.set(2_000);
        step(&mut display, &channels, &clock);
        step(&mut display, &channels, &clock);
        assert_eq!(display.display().rows[0], "Status: UNLOCKED");
        assert_eq!(display.display().rows[1], "Access Granted");
    }
}
