//! LED task.

use core::time::Duration;

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::TimePort;
use crate::channels::{Channels, recv_timeout};
use crate::drivers::indicator::LedIndicator;
use crate::error::Result;

pub const LED_WAIT: Duration = Duration::from_millis(20);

/// Apply at most one queued command, then advance the flash timer.  GPIO
/// failures are logged; the next command or tick tries again.
pub fn step<R: OutputPin, G: OutputPin>(
    led: &mut LedIndicator<R, G>,
    channels: &Channels,
    clock: &impl TimePort,
) {
    if let Some(cmd) = recv_timeout(&channels.led, LED_WAIT) {
        if let Err(e) = led.apply(cmd.state, clock.now_ms()) {
            warn!("LED: {}", e);
        }
    }
    if let Err(e) = led.tick(clock.now_ms()) {
        warn!("LED: {}", e);
    }
}

pub fn run<R: OutputPin, G: OutputPin>(
    mut led: LedIndicator<R, G>,
    channels: &Channels,
    clock: impl TimePort,
) -> Result<()> {
    loop {
        step(&mut led, channels, &clock);
    }
}
