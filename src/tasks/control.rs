//! Control task: the only owner of the state machine and the PIN.
//!
//! Each iteration feeds the watchdog, then takes at most one message from
//! each input channel without waiting.  When all three are empty it blocks
//! on the key channel for the configured poll period.

use core::time::Duration;

use log::debug;

use crate::app::ports::{ControlSink, StoragePort, TimePort};
use crate::app::service::ControlService;
use crate::channels::{Channels, recv_timeout};
use crate::drivers::watchdog::Watchdog;
use crate::error::Result;

pub struct ControlTask<S: StoragePort, C: TimePort> {
    service: ControlService<S, C>,
    watchdog: Watchdog,
    idle_wait: Duration,
}

impl<S: StoragePort, C: TimePort> ControlTask<S, C> {
    /// `watchdog` must be created on the thread that will run the loop.
    pub fn new(service: ControlService<S, C>, watchdog: Watchdog, poll_ms: u32) -> Self {
        Self {
            service,
            watchdog,
            idle_wait: Duration::from_millis(u64::from(poll_ms)),
        }
    }

    pub fn service(&self) -> &ControlService<S, C> {
        &self.service
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    /// Service one message per input channel.  Returns how many were
    /// handled.
    pub fn poll_inputs(&mut self, channels: &Channels, sink: &mut impl ControlSink) -> Result<usize> {
        let mut handled = 0;
        if let Some(key) = recv_timeout(&channels.key, Duration::ZERO) {
            self.service.handle_key(key, sink)?;
            handled += 1;
        }
        if let Some(motion) = recv_timeout(&channels.motion, Duration::ZERO) {
            self.service.handle_motion(motion, sink);
            handled += 1;
        }
        if let Some(cmd) = recv_timeout(&channels.command, Duration::ZERO) {
            debug!("Control: command '{}'", cmd.name());
            self.service.handle_command(cmd, sink);
            handled += 1;
        }
        Ok(handled)
    }

    /// One loop iteration.
    pub fn step(&mut self, channels: &Channels, sink: &mut impl ControlSink) -> Result<()> {
        self.watchdog.feed();
        if self.poll_inputs(channels, sink)? > 0 {
            return Ok(());
        }
        if let Some(key) = recv_timeout(&channels.key, self.idle_wait) {
            self.service.handle_key(key, sink)?;
        }
        Ok(())
    }

    /// Announce the boot state, then loop until a fatal error.
    pub fn run(mut self, channels: &Channels, mut sink: impl ControlSink) -> Result<()> {
        self.service.start(&mut sink);
        loop {
            self.step(channels, &mut sink)?;
        }
    }
}
