//! Messages crossing task boundaries by value.
//!
//! Input events flow into the control task; output commands flow from it
//! to the LED and display tasks.  Telemetry has its own type in
//! [`crate::telemetry`].

use heapless::String;

use crate::fsm::SafeState;

/// Characters a 4x4 matrix keypad can produce.
pub const KEYPAD_KEYS: [char; 16] = [
    '1', '2', '3', 'A', //
    '4', '5', '6', 'B', //
    '7', '8', '9', 'C', //
    '*', '0', '#', 'D',
];

/// A single debounced keypress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    key: char,
}

/// What a key means to the PIN entry flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Digit(char),
    Clear,
    Submit,
    Function(char),
}

impl KeyEvent {
    /// `None` for characters the keypad cannot produce.
    pub fn new(key: char) -> Option<Self> {
        KEYPAD_KEYS.contains(&key).then_some(Self { key })
    }

    pub fn key(self) -> char {
        self.key
    }

    pub fn action(self) -> KeyAction {
        match self.key {
            '*' => KeyAction::Clear,
            '#' => KeyAction::Submit,
            c if c.is_ascii_digit() => KeyAction::Digit(c),
            c => KeyAction::Function(c),
        }
    }
}

/// A confirmed tamper movement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionEvent {
    /// Acceleration magnitude in g.
    pub magnitude_g: f32,
}

/// Indicator update: render the given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedCommand {
    pub state: SafeState,
}

/// One row of a 16x2 character display.
pub type DisplayText = String<16>;

/// Display update requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCommand {
    /// Full state screen (two rows + backlight).
    ShowState(SafeState),
    /// PIN progress as asterisks.
    PinEntry { digits: u8 },
    /// Verification in progress.
    Checking,
    /// Transient second-row message that reverts to `restore` after
    /// `duration_ms`.
    Message {
        text: DisplayText,
        duration_ms: u32,
        restore: SafeState,
    },
    /// Issued by the message timer; ignored unless `generation` is current.
    Restore { state: SafeState, generation: u32 },
}

impl DisplayCommand {
    /// Transient message; text beyond 16 characters is cut.
    pub fn message(text: &str, duration_ms: u32, restore: SafeState) -> Self {
        let mut t = DisplayText::new();
        for c in text.chars() {
            if t.push(c).is_err() {
                break;
            }
        }
        Self::Message {
            text: t,
            duration_ms,
            restore,
        }
    }
}
