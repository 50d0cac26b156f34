//! [`ControlSink`] backed by the output channels.
//!
//! LED and display updates are dropped when their channel is full.  A
//! telemetry event that cannot be queued goes straight into the
//! publisher's ring buffer instead, where the next sweep or reconnect
//! flush picks it up.

use embassy_sync::channel::TrySendError;
use log::{error, warn};

use crate::app::events::{DisplayCommand, LedCommand};
use crate::app::ports::{ControlSink, TimePort};
use crate::channels::{Channels, send_or_drop};
use crate::telemetry::publisher::TelemetryPublisher;
use crate::telemetry::TelemetryEvent;

pub struct ChannelSink<'a, C: TimePort> {
    channels: &'a Channels,
    publisher: Option<&'a TelemetryPublisher>,
    clock: C,
}

impl<'a, C: TimePort> ChannelSink<'a, C> {
    pub fn new(channels: &'a Channels, publisher: Option<&'a TelemetryPublisher>, clock: C) -> Self {
        Self {
            channels,
            publisher,
            clock,
        }
    }
}

impl<C: TimePort> ControlSink for ChannelSink<'_, C> {
    fn led(&mut self, command: LedCommand) {
        send_or_drop(&self.channels.led, command, "led");
    }

    fn display(&mut self, command: DisplayCommand) {
        send_or_drop(&self.channels.display, command, "display");
    }

    fn telemetry(&mut self, event: TelemetryEvent) {
        let Err(TrySendError::Full(event)) = self.channels.telemetry.try_send(event) else {
            return;
        };
        match self.publisher {
            Some(publisher) => {
                warn!("telemetry channel full, buffering '{}' directly", event.kind.wire_name());
                if let Err(e) = publisher.admit(event, self.clock.now_ms()) {
                    error!("telemetry: {}", e);
                }
            }
            None => warn!("telemetry channel full, dropping '{}'", event.kind.wire_name()),
        }
    }
}
