mod gpio;
mod layout;

use std::fmt::Debug;
use crate::GpioResult;
pub use gpio::*;
pub use layout::*;

/// Number of row (sense) lines on the keypad.
pub const ROWS: usize = 4;
/// Number of column (drive) lines on the keypad.
pub const COLS: usize = 3;

/// The `Keypad` trait defines the interface for keypad input devices.
pub trait Keypad: Debug {
    type Key;

    /// Scans for a key press, returning at most one confirmed key per call.
    fn poll(&mut self) -> GpioResult<Option<Self::Key>>;
}
