//! Input tasks: keypad scanner and motion poller.
//!
//! Both only produce.  Bus or GPIO hiccups during a scan are logged and
//! the next scan tries again; a failed sensor init halts the motion task
//! and leaves the rest of the firmware running.

use std::sync::Arc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::i2c::I2c;
use log::{info, warn};

use crate::app::events::MotionEvent;
use crate::app::motion::{DETECTION_HOLDOFF_MS, MotionDetector, Sensitivity};
use crate::channels::{Channels, send_or_drop};
use crate::drivers::bus::SharedBus;
use crate::drivers::keypad::Keypad;
use crate::drivers::mpu6050::Mpu6050;
use crate::error::Result;

pub const KEYPAD_SCAN_INTERVAL_MS: u32 = 20;
/// Matches the sensor's ~50 Hz output rate.
pub const MOTION_SAMPLE_INTERVAL_MS: u32 = 20;

// ───────────────────────────────────────────────────────────────
// Keypad
// ───────────────────────────────────────────────────────────────

/// One scan.  Returns `true` if a key was queued.
pub fn keypad_step<R: OutputPin, C: InputPin>(
    keypad: &mut Keypad<R, C>,
    delay: &mut impl DelayNs,
    channels: &Channels,
) -> bool {
    match keypad.poll(delay) {
        Ok(Some(key)) => send_or_drop(&channels.key, key, "key"),
        Ok(None) => false,
        Err(e) => {
            warn!("Keypad: scan failed ({})", e);
            false
        }
    }
}

pub fn run_keypad<R: OutputPin, C: InputPin>(
    mut keypad: Keypad<R, C>,
    mut delay: impl DelayNs,
    channels: &Channels,
) -> Result<()> {
    info!("Keypad: scanning every {} ms", KEYPAD_SCAN_INTERVAL_MS);
    loop {
        keypad_step(&mut keypad, &mut delay, channels);
        delay.delay_ms(KEYPAD_SCAN_INTERVAL_MS);
    }
}

// ───────────────────────────────────────────────────────────────
// Motion
// ───────────────────────────────────────────────────────────────

pub struct MotionPoller<B> {
    sensor: Mpu6050<B>,
    detector: MotionDetector,
    sensitivity: Arc<Sensitivity>,
}

impl<B: I2c> MotionPoller<B> {
    /// Bring up the sensor.  An error here is fatal for the motion task.
    pub fn init(
        bus: Arc<SharedBus<B>>,
        sensitivity: Arc<Sensitivity>,
        delay: &mut impl DelayNs,
    ) -> Result<Self> {
        let sensor = Mpu6050::init(bus, delay)?;
        Ok(Self {
            sensor,
            detector: MotionDetector::new(),
            sensitivity,
        })
    }

    /// Read one sample against the current threshold and queue any
    /// confirmed movement.
    pub fn step(&mut self, channels: &Channels) -> Option<MotionEvent> {
        let sample = match self.sensor.read() {
            Ok(s) => s,
            Err(e) => {
                warn!("Motion: read failed ({})", e);
                return None;
            }
        };
        let event = self.detector.feed(sample, self.sensitivity.get())?;
        info!("Motion: movement detected ({:.2} g)", event.magnitude_g);
        send_or_drop(&channels.motion, event, "motion");
        Some(event)
    }

    pub fn run(mut self, mut delay: impl DelayNs, channels: &Channels) -> Result<()> {
        loop {
            let wait = match self.step(channels) {
                Some(_) => DETECTION_HOLDOFF_MS,
                None => MOTION_SAMPLE_INTERVAL_MS,
            };
            delay.delay_ms(wait);
        }
    }
}
