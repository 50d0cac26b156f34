//! 4x4 matrix keypad.
//!
//! Rows are outputs idling high; columns are pulled-up inputs.  A scan
//! drives one row low at a time and reads the columns.  A key is reported
//! once after [`DEBOUNCE_SCANS`] identical scans and not again until it
//! is released.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::app::events::{KEYPAD_KEYS, KeyEvent};
use crate::error::BusError;

pub const DEBOUNCE_SCANS: u8 = 2;
/// Settle time after driving a row low.
const ROW_SETTLE_US: u32 = 10;

#[derive(Debug, Default)]
pub struct Debouncer {
    last: Option<char>,
    stable: u8,
    reported: bool,
}

impl Debouncer {
    pub fn feed(&mut self, raw: Option<char>) -> Option<KeyEvent> {
        if raw != self.last {
            self.last = raw;
            self.stable = 1;
            self.reported = false;
        } else {
            self.stable = (self.stable + 1).min(DEBOUNCE_SCANS);
        }

        let key = self.last?;
        if self.reported || self.stable < DEBOUNCE_SCANS {
            return None;
        }
        self.reported = true;
        KeyEvent::new(key)
    }
}

pub struct Keypad<R, C> {
    rows: [R; 4],
    cols: [C; 4],
    debouncer: Debouncer,
}

impl<R: OutputPin, C: InputPin> Keypad<R, C> {
    pub fn new(mut rows: [R; 4], cols: [C; 4]) -> Result<Self, BusError> {
        for row in &mut rows {
            row.set_high().map_err(|_| BusError::Gpio)?;
        }
        Ok(Self {
            rows,
            cols,
            debouncer: Debouncer::default(),
        })
    }

    /// One scan plus debounce.
    pub fn poll(&mut self, delay: &mut impl DelayNs) -> Result<Option<KeyEvent>, BusError> {
        let raw = self.scan(delay)?;
        Ok(self.debouncer.feed(raw))
    }

    /// First pressed key in row-major order, if any.
    fn scan(&mut self, delay: &mut impl DelayNs) -> Result<Option<char>, BusError> {
        let mut found = None;
        for (r, row) in self.rows.iter_mut().enumerate() {
            row.set_low().map_err(|_| BusError::Gpio)?;
            delay.delay_us(ROW_SETTLE_US);
            for (c, col) in self.cols.iter_mut().enumerate() {
                if found.is_none() && col.is_low().map_err(|_| BusError::Gpio)? {
                    found = Some(KEYPAD_KEYS[r * 4 + c]);
                }
            }
            row.set_high().map_err(|_| BusError::Gpio)?;
        }
        Ok(found)
    }
}
