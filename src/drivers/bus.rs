//! Shared I2C bus.
//!
//! The LCD and the accelerometer sit on the same two wires.  Every
//! transaction takes the bus mutex for its whole duration so register
//! writes from one device never interleave with reads from the other.

use std::sync::Mutex;

use embedded_hal::i2c::{Error as _, I2c};
use log::warn;

use crate::error::BusError;

pub struct SharedBus<B> {
    inner: Mutex<B>,
}

impl<B: I2c> SharedBus<B> {
    pub fn new(bus: B) -> Self {
        Self {
            inner: Mutex::new(bus),
        }
    }

    /// Run `f` with exclusive access to the bus.
    pub fn with<R>(&self, f: impl FnOnce(&mut B) -> Result<R, B::Error>) -> Result<R, BusError> {
        let mut bus = self.inner.lock().map_err(|_| BusError::LockPoisoned)?;
        f(&mut bus).map_err(|e| {
            warn!("I2C transfer failed: {:?}", e.kind());
            BusError::Transfer
        })
    }

    pub fn write(&self, addr: u8, bytes: &[u8]) -> Result<(), BusError> {
        self.with(|bus| bus.write(addr, bytes))
    }

    /// Write a register address, then read `buf.len()` bytes from it.
    pub fn read_register(&self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), BusError> {
        self.with(|bus| bus.write_read(addr, &[reg], buf))
    }

    pub fn write_register(&self, addr: u8, reg: u8, value: u8) -> Result<(), BusError> {
        self.write(addr, &[reg, value])
    }
}
