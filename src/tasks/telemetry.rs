//! Telemetry task: sole driver of the [`TelemetryPublisher`].
//!
//! Per iteration: follow the link session level (flushing the backlog on
//! every new session), apply every queued acknowledgement, wait up to
//! 100 ms for one telemetry event and publish it, then run the timeout
//! sweep if its period has elapsed.

use core::time::Duration;
use std::sync::Arc;

use embedded_hal::delay::DelayNs;
use log::info;

use crate::app::ports::{Tick, TimePort};
use crate::channels::{Channels, recv_timeout};
use crate::error::Result;
use crate::link::LinkSession;
use crate::link::transport::{LinkEvent, PublishPort};
use crate::telemetry::publisher::TelemetryPublisher;

pub const TELEMETRY_WAIT: Duration = Duration::from_millis(100);

pub struct TelemetryTask<P, C, D> {
    publisher: Arc<TelemetryPublisher>,
    link: P,
    clock: C,
    delay: D,
    sweep_interval_ms: u32,
    last_sweep: Tick,
    seen_session: (bool, u32),
}

impl<P: PublishPort, C: TimePort, D: DelayNs> TelemetryTask<P, C, D> {
    pub fn new(
        publisher: Arc<TelemetryPublisher>,
        link: P,
        clock: C,
        delay: D,
        sweep_interval_ms: u32,
    ) -> Self {
        let last_sweep = clock.now_ms();
        Self {
            publisher,
            link,
            clock,
            delay,
            sweep_interval_ms,
            last_sweep,
            seen_session: (false, 0),
        }
    }

    pub fn link(&self) -> &P {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut P {
        &mut self.link
    }

    /// React to a transport notification.
    pub fn handle_link_event(&mut self, event: LinkEvent) -> Result<()> {
        match event {
            LinkEvent::Connected => {
                self.publisher.set_connected(true);
                let sent = self
                    .publisher
                    .flush_backlog(&mut self.link, &mut self.delay, &self.clock)?;
                if sent > 0 {
                    info!("Telemetry: {} buffered events republished", sent);
                }
            }
            LinkEvent::Disconnected => {
                self.publisher.set_connected(false);
            }
            LinkEvent::Delivered(id) => {
                self.publisher.on_delivered(id)?;
            }
        }
        Ok(())
    }

    /// Apply the session level if it changed since the last look.  A new
    /// session count while up is a fresh connection even if the
    /// disconnect in between was never observed.
    pub fn follow_session(&mut self, session: &LinkSession) -> Result<()> {
        let now = session.snapshot();
        if now == self.seen_session {
            return Ok(());
        }
        self.seen_session = now;
        self.handle_link_event(if now.0 {
            LinkEvent::Connected
        } else {
            LinkEvent::Disconnected
        })
    }

    /// Run the sweep if `sweep_interval_ms` has passed since the last one.
    pub fn maybe_sweep(&mut self) -> Result<()> {
        let now = self.clock.now_ms();
        if now.wrapping_sub(self.last_sweep) < self.sweep_interval_ms {
            return Ok(());
        }
        self.last_sweep = now;
        self.publisher.sweep_timeouts(&mut self.link, now)?;
        Ok(())
    }

    pub fn step(&mut self, channels: &Channels) -> Result<()> {
        self.follow_session(&channels.session)?;
        while let Ok(event) = channels.link.try_receive() {
            self.handle_link_event(event)?;
        }
        if let Some(event) = recv_timeout(&channels.telemetry, TELEMETRY_WAIT) {
            let now = self.clock.now_ms();
            self.publisher.publish(&mut self.link, event, now)?;
        }
        self.maybe_sweep()
    }

    pub fn run(mut self, channels: &Channels) -> Result<()> {
        loop {
            self.step(channels)?;
        }
    }
}
