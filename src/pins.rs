//! GPIO / peripheral pin assignments for the safe controller board
//! (ESP32-DevKitC).
//!
//! Single source of truth for documentation and tests; `main` takes the
//! matching typed pins from `Peripherals`, so a change here must be
//! mirrored there.

// ---------------------------------------------------------------------------
// 4x4 matrix keypad
// ---------------------------------------------------------------------------

/// Row outputs, top to bottom (`1 2 3 A` … `* 0 # D`).
pub const KEYPAD_ROW_GPIOS: [i32; 4] = [13, 12, 14, 27];
/// Column inputs with internal pull-ups, left to right.
pub const KEYPAD_COL_GPIOS: [i32; 4] = [26, 25, 33, 32];

// ---------------------------------------------------------------------------
// Status LEDs (active high)
// ---------------------------------------------------------------------------

pub const LED_RED_GPIO: i32 = 2;
pub const LED_GREEN_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// I²C bus: MPU6050 (0x68), LCD1602 controller (0x3E), RGB backlight (0x60)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 21;
pub const I2C_SCL_GPIO: i32 = 22;
pub const I2C_BAUD_HZ: u32 = 100_000;
