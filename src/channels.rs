//! Inter-task communication channels.
//!
//! Uses `embassy-sync` bounded channels so producers never block: a send
//! to a full channel drops the message and logs a warning.  Each channel
//! has exactly one consuming task.
//!
//! ```text
//!  keypad ──key────▶ ┌─────────┐ ──led────────▶ LED task
//!  motion ──motion─▶ │ control │ ──display────▶ display task
//!  link ────command▶ └─────────┘ ──telemetry──▶ telemetry task
//!  link ────link (delivered) ──────────────────▶ telemetry task
//!  link ────session (level, never dropped) ─────▶ telemetry task
//! ```

use core::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use futures_lite::future;
use log::warn;

use crate::app::commands::RemoteCommand;
use crate::app::events::{DisplayCommand, KeyEvent, LedCommand, MotionEvent};
use crate::link::LinkSession;
use crate::link::transport::LinkEvent;
use crate::telemetry::TelemetryEvent;

/// Bounded multi-producer channel guarded by a critical section.
pub type Channel<T, const N: usize> =
    embassy_sync::channel::Channel<CriticalSectionRawMutex, T, N>;

pub const KEY_DEPTH: usize = 8;
pub const MOTION_DEPTH: usize = 4;
pub const COMMAND_DEPTH: usize = 5;
pub const LED_DEPTH: usize = 4;
pub const DISPLAY_DEPTH: usize = 8;
pub const TELEMETRY_DEPTH: usize = 10;
pub const LINK_DEPTH: usize = 16;

/// The complete channel set.  One instance lives for the whole program
/// and is shared by reference with every task.
pub struct Channels {
    pub key: Channel<KeyEvent, KEY_DEPTH>,
    pub motion: Channel<MotionEvent, MOTION_DEPTH>,
    pub command: Channel<RemoteCommand, COMMAND_DEPTH>,
    pub led: Channel<LedCommand, LED_DEPTH>,
    pub display: Channel<DisplayCommand, DISPLAY_DEPTH>,
    pub telemetry: Channel<TelemetryEvent, TELEMETRY_DEPTH>,
    pub link: Channel<LinkEvent, LINK_DEPTH>,
    pub session: LinkSession,
}

impl Channels {
    pub const fn new() -> Self {
        Self {
            key: Channel::new(),
            motion: Channel::new(),
            command: Channel::new(),
            led: Channel::new(),
            display: Channel::new(),
            telemetry: Channel::new(),
            link: Channel::new(),
            session: LinkSession::new(),
        }
    }
}

impl Default for Channels {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-blocking send.  On a full channel the message is dropped, a warning
/// naming the channel is logged, and `false` is returned.
pub fn send_or_drop<T, const N: usize>(channel: &Channel<T, N>, msg: T, name: &str) -> bool {
    match channel.try_send(msg) {
        Ok(()) => true,
        Err(_) => {
            warn!("{} channel full, dropping message", name);
            false
        }
    }
}

/// Receive with a bounded wait.  A zero timeout polls once without
/// suspending.
pub fn recv_timeout<T, const N: usize>(channel: &Channel<T, N>, timeout: Duration) -> Option<T> {
    if timeout.is_zero() {
        return channel.try_receive().ok();
    }
    future::block_on(future::or(
        async { Some(channel.receive().await) },
        async {
            async_io_mini::Timer::after(timeout).await;
            None
        },
    ))
}
