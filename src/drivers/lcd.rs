//! 16x2 character LCD (HD44780-compatible controller at 0x3E) with an RGB
//! backlight controller at 0x60, both on the shared I2C bus.

use std::sync::Arc;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{error, info};

use super::bus::SharedBus;
use super::display::{CharDisplay, ROW_WIDTH, Rgb};
use crate::error::BusError;

pub const LCD_ADDR: u8 = 0x3E;
pub const RGB_ADDR: u8 = 0x60;

// Control bytes
const CMD: u8 = 0x00;
const DATA: u8 = 0x40;

// HD44780 commands
const CLEAR: u8 = 0x01;
const ENTRY_MODE_LEFT: u8 = 0x04 | 0x02;
const DISPLAY_ON: u8 = 0x08 | 0x04;
const FUNCTION_8BIT_2LINE: u8 = 0x20 | 0x10 | 0x08;
const SET_DDRAM: u8 = 0x80;
const ROW_OFFSETS: [u8; 2] = [0x00, 0x40];

// Backlight registers
const RGB_MODE1: u8 = 0x00;
const RGB_MODE2: u8 = 0x01;
const RGB_BLUE: u8 = 0x02;
const RGB_GREEN: u8 = 0x03;
const RGB_RED: u8 = 0x04;
const RGB_LEDOUT: u8 = 0x08;

pub struct Lcd1602<B> {
    bus: Arc<SharedBus<B>>,
}

impl<B: I2c> Lcd1602<B> {
    /// Power-up sequence for both controllers.
    pub fn init(bus: Arc<SharedBus<B>>, delay: &mut impl DelayNs) -> Result<Self, BusError> {
        info!("LCD: init (controller 0x{:02X}, backlight 0x{:02X})", LCD_ADDR, RGB_ADDR);
        let lcd = Self { bus };
        delay.delay_ms(50);

        lcd.rgb(RGB_MODE1, 0x00)
            .and_then(|()| lcd.rgb(RGB_LEDOUT, 0xFF))
            .and_then(|()| lcd.rgb(RGB_MODE2, 0x20))
            .inspect_err(|e| error!("LCD: backlight init failed: {}", e))?;

        delay.delay_ms(50);
        lcd.command(FUNCTION_8BIT_2LINE)?;
        delay.delay_ms(5);
        lcd.command(DISPLAY_ON)?;
        delay.delay_ms(1);
        lcd.command(CLEAR)?;
        delay.delay_ms(2);
        lcd.command(ENTRY_MODE_LEFT)?;
        info!("LCD: ready");
        Ok(lcd)
    }

    fn command(&self, cmd: u8) -> Result<(), BusError> {
        self.bus.write(LCD_ADDR, &[CMD, cmd])
    }

    fn rgb(&self, reg: u8, value: u8) -> Result<(), BusError> {
        self.bus.write_register(RGB_ADDR, reg, value)
    }
}

impl<B: I2c> CharDisplay for Lcd1602<B> {
    fn write_row(&mut self, row: u8, text: &str) -> Result<(), BusError> {
        let offset = ROW_OFFSETS[usize::from(row.min(1))];
        self.command(SET_DDRAM | offset)?;

        let mut frame = [b' '; ROW_WIDTH + 1];
        frame[0] = DATA;
        for (slot, c) in frame[1..].iter_mut().zip(text.chars()) {
            *slot = if c.is_ascii() { c as u8 } else { b'?' };
        }
        self.bus.write(LCD_ADDR, &frame)
    }

    fn set_backlight(&mut self, (r, g, b): Rgb) -> Result<(), BusError> {
        self.rgb(RGB_RED, r)?;
        self.rgb(RGB_GREEN, g)?;
        self.rgb(RGB_BLUE, b)
    }
}
