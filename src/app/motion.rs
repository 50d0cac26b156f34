//! Tamper detection from raw accelerometer samples.
//!
//! A sample is a hit when its squared magnitude exceeds the squared
//! threshold.  Hits accumulate (saturating) and decay by one on a quiet
//! sample; reaching [`MOVEMENT_HIT_COUNT`] confirms a movement.

use std::sync::atomic::{AtomicI32, Ordering};

use log::info;

use super::events::MotionEvent;

pub const MOVEMENT_THRESHOLD_DEFAULT: i32 = 20_000;
pub const MOVEMENT_THRESHOLD_MIN: i32 = 17_000;
pub const MOVEMENT_THRESHOLD_MAX: i32 = 45_000;
pub const MOVEMENT_HIT_COUNT: u8 = 3;
/// Quiet period after a confirmed movement.
pub const DETECTION_HOLDOFF_MS: u32 = 500;
/// Raw counts per g at the ±2g range.
pub const LSB_PER_G: f32 = 16_384.0;

/// Movement threshold shared between the command processor (writer) and
/// the motion poller (reader).
#[derive(Debug)]
pub struct Sensitivity(AtomicI32);

impl Sensitivity {
    pub fn new(threshold: i32) -> Self {
        Self(AtomicI32::new(clamp_threshold(threshold)))
    }

    pub fn get(&self) -> i32 {
        self.0.load(Ordering::Relaxed)
    }

    /// Store `raw` clamped to the accepted range; returns the stored value.
    pub fn set(&self, raw: i32) -> i32 {
        let threshold = clamp_threshold(raw);
        self.0.store(threshold, Ordering::Relaxed);
        info!("Motion: threshold set to {} (requested {})", threshold, raw);
        threshold
    }
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self::new(MOVEMENT_THRESHOLD_DEFAULT)
    }
}

pub fn clamp_threshold(raw: i32) -> i32 {
    raw.clamp(MOVEMENT_THRESHOLD_MIN, MOVEMENT_THRESHOLD_MAX)
}

/// One raw accelerometer reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccelSample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl AccelSample {
    pub fn magnitude_sq(self) -> i64 {
        let (x, y, z) = (i64::from(self.x), i64::from(self.y), i64::from(self.z));
        x * x + y * y + z * z
    }

    pub fn magnitude_g(self) -> f32 {
        (self.magnitude_sq() as f32).sqrt() / LSB_PER_G
    }
}

/// Hit counter with decay.
#[derive(Debug, Default)]
pub struct MotionDetector {
    hits: u8,
}

impl MotionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> u8 {
        self.hits
    }

    /// Feed one sample.  Returns an event once enough hits accumulate; the
    /// counter restarts from zero afterwards.
    pub fn feed(&mut self, sample: AccelSample, threshold: i32) -> Option<MotionEvent> {
        let limit = i64::from(threshold);
        if sample.magnitude_sq() > limit * limit {
            self.hits = (self.hits + 1).min(MOVEMENT_HIT_COUNT);
        } else {
            self.hits = self.hits.saturating_sub(1);
        }

        if self.hits < MOVEMENT_HIT_COUNT {
            return None;
        }
        self.hits = 0;
        Some(MotionEvent {
            magnitude_g: sample.magnitude_g(),
        })
    }
}
