use super::{COLS, ROWS};

/// Represents the keys on a 4x3 telephone-style keypad.
///
/// ```text
/// 1 2 3
/// 4 5 6
/// 7 8 9
/// * 0 #
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum KeypadKey {
    /// The `1` key.
    Key1,
    /// The `2` key.
    Key2,
    /// The `3` key.
    Key3,
    /// The `4` key.
    Key4,
    /// The `5` key.
    Key5,
    /// The `6` key.
    Key6,
    /// The `7` key.
    Key7,
    /// The `8` key.
    Key8,
    /// The `9` key.
    Key9,
    /// The `0` key.
    Key0,
    /// The `*` key.
    KeyAsterisk,
    /// The `#` key.
    KeyHash,
}

use KeypadKey::*;

const LAYOUT: [[KeypadKey; COLS]; ROWS] = [
    [ Key1, Key2, Key3, ],
    [ Key4, Key5, Key6, ],
    [ Key7, Key8, Key9, ],
    [ KeyAsterisk, Key0, KeyHash, ],
];

impl KeypadKey {
    /// Converts a position tuple (row, column) to a [KeypadKey].
    pub fn from_position(pos: (usize, usize)) -> Option<KeypadKey> {
        LAYOUT.get(pos.0)?.get(pos.1).copied()
    }

    /// The (row, column) the key sits at.
    pub fn position(self) -> (usize, usize) {
        match self {
            Key1 => (0, 0),
            Key2 => (0, 1),
            Key3 => (0, 2),
            Key4 => (1, 0),
            Key5 => (1, 1),
            Key6 => (1, 2),
            Key7 => (2, 0),
            Key8 => (2, 1),
            Key9 => (2, 2),
            KeyAsterisk => (3, 0),
            Key0 => (3, 1),
            KeyHash => (3, 2),
        }
    }

    /// Parses a printable symbol back into a key.
    pub fn from_char(c: char) -> Option<KeypadKey> {
        match c {
            '*' => Some(KeyAsterisk),
            '#' => Some(KeyHash),
            '0' => Some(Key0),
            '1'..='9' => {
                let n = c as usize - '1' as usize;
                Self::from_position((n / COLS, n % COLS))
            }
            _ => None,
        }
    }

    /// Converts the [KeypadKey] to its corresponding character.
    pub fn to_char(self) -> char {
        match self {
            Key1 => '1',
            Key2 => '2',
            Key3 => '3',
            Key4 => '4',
            Key5 => '5',
            Key6 => '6',
            Key7 => '7',
            Key8 => '8',
            Key9 => '9',
            Key0 => '0',
            KeyAsterisk => '*',
            KeyHash => '#',
        }
    }

    /// The digit this key enters, `None` for `*` and `#`.
    pub fn digit(self) -> Option<char> {
        match self {
            KeyAsterisk | KeyHash => None,
            key => Some(key.to_char()),
        }
    }
}
