//! MPU6050 accelerometer on the shared I2C bus.

use std::sync::Arc;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{error, info, warn};

use super::bus::SharedBus;
use crate::app::motion::AccelSample;
use crate::error::BusError;

pub const MPU6050_ADDR: u8 = 0x68;

const PWR_MGMT_1: u8 = 0x6B;
const WHO_AM_I: u8 = 0x75;
const ACCEL_XOUT_H: u8 = 0x3B;
const ACCEL_CONFIG: u8 = 0x1C;
const CONFIG: u8 = 0x1A;
const SMPLRT_DIV: u8 = 0x19;

pub struct Mpu6050<B> {
    bus: Arc<SharedBus<B>>,
}

impl<B: I2c> Mpu6050<B> {
    /// Wake the sensor, check its identity and select ±2g at ~50 Hz.
    pub fn init(bus: Arc<SharedBus<B>>, delay: &mut impl DelayNs) -> Result<Self, BusError> {
        if let Err(e) = bus.write_register(MPU6050_ADDR, PWR_MGMT_1, 0x00) {
            warn!("MPU6050: wake failed ({})", e);
        }
        delay.delay_ms(100);

        let mut id = [0u8; 1];
        bus.read_register(MPU6050_ADDR, WHO_AM_I, &mut id)
            .inspect_err(|e| error!("MPU6050: WHO_AM_I read failed ({})", e))?;
        if id[0] != MPU6050_ADDR {
            error!("MPU6050: unexpected WHO_AM_I 0x{:02X}", id[0]);
            return Err(BusError::WrongDevice(id[0]));
        }

        for (reg, value) in [(ACCEL_CONFIG, 0x00), (CONFIG, 0x01), (SMPLRT_DIV, 19)] {
            if let Err(e) = bus.write_register(MPU6050_ADDR, reg, value) {
                warn!("MPU6050: config register 0x{:02X} failed ({})", reg, e);
            }
        }
        info!("MPU6050: detected, ±2g range");
        Ok(Self { bus })
    }

    /// Read the three acceleration axes.
    pub fn read(&self) -> Result<AccelSample, BusError> {
        let mut raw = [0u8; 6];
        self.bus.read_register(MPU6050_ADDR, ACCEL_XOUT_H, &mut raw)?;
        Ok(AccelSample {
            x: i16::from_be_bytes([raw[0], raw[1]]),
            y: i16::from_be_bytes([raw[2], raw[3]]),
            z: i16::from_be_bytes([raw[4], raw[5]]),
        })
    }
}
