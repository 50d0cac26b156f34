//! Peripheral drivers: shared I2C bus, LCD, accelerometer, keypad, LEDs,
//! watchdog and task spawning.

pub mod bus;
pub mod display;
pub mod indicator;
pub mod keypad;
pub mod lcd;
pub mod mpu6050;
pub mod task_pin;
pub mod watchdog;
