//! Remote link: wire codec, transport port, and inbound routing.
//!
//! The MQTT client runs its own callbacks; everything it learns is turned
//! into channel messages here so no callback touches control or telemetry
//! state directly.

pub mod codec;
pub mod transport;

use core::sync::atomic::{AtomicU32, Ordering};

use log::{info, warn};

use crate::app::commands::RemoteCommand;
use crate::channels::{COMMAND_DEPTH, Channel, Channels, send_or_drop};
use transport::LinkEvent;

/// Broker session state as a level, never queued.
///
/// Bit 0 is "connected"; the remaining bits count sessions so a consumer
/// that samples `up` twice across a quick reconnect still sees a new
/// session.
pub struct LinkSession {
    word: AtomicU32,
}

impl LinkSession {
    pub const fn new() -> Self {
        Self {
            word: AtomicU32::new(0),
        }
    }

    pub fn connect(&self) {
        let _ = self.word.fetch_update(Ordering::AcqRel, Ordering::Acquire, |w| {
            Some((((w >> 1).wrapping_add(1)) << 1) | 1)
        });
    }

    pub fn disconnect(&self) {
        self.word.fetch_and(!1, Ordering::AcqRel);
    }

    /// `(connected, session count)`.
    pub fn snapshot(&self) -> (bool, u32) {
        let w = self.word.load(Ordering::Acquire);
        (w & 1 == 1, w >> 1)
    }
}

impl Default for LinkSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a payload from the command topic and queue it for the control
/// task.  Invalid payloads are logged and dropped.
pub fn route_command(payload: &[u8], commands: &Channel<RemoteCommand, COMMAND_DEPTH>) -> bool {
    match codec::decode_command(payload) {
        Ok(cmd) => {
            info!("Link: received '{}' command", cmd.name());
            send_or_drop(commands, cmd, "command")
        }
        Err(e) => {
            warn!("Link: rejected command payload ({} bytes): {}", payload.len(), e);
            false
        }
    }
}

/// Hand a transport notification to the telemetry task.  Session changes
/// update [`LinkSession`] and cannot be lost; acknowledgements are queued
/// and may be dropped, the timeout sweep covers those.
pub fn route_link_event(event: LinkEvent, channels: &Channels) -> bool {
    match event {
        LinkEvent::Connected => {
            channels.session.connect();
            true
        }
        LinkEvent::Disconnected => {
            channels.session.disconnect();
            true
        }
        LinkEvent::Delivered(_) => send_or_drop(&channels.link, event, "link"),
    }
}
