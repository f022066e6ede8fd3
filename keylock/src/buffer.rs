//! Digits typed since the last control key.

use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Longest passcode (and therefore longest input) the lock accepts.
pub const PASSCODE_MAX_LEN: usize = 15;

#[derive(Copy, Clone, Debug, Error, Eq, PartialEq)]
pub enum BufferError {
    #[error("input is already {} symbols long", PASSCODE_MAX_LEN)]
    Overflow,
}

/// Bounded, append-only sequence of entered symbols.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InputBuffer {
    symbols: Vec<char>,
}

impl InputBuffer {
    pub fn new() -> Self {
        InputBuffer {
            symbols: Vec::with_capacity(PASSCODE_MAX_LEN),
        }
    }

    /// Appends a symbol, leaving the buffer untouched if it is already full.
    pub fn append(&mut self, symbol: char) -> Result<(), BufferError> {
        if self.symbols.len() >= PASSCODE_MAX_LEN {
            return Err(BufferError::Overflow);
        }
        self.symbols.push(symbol);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.symbols.clear();
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Exact comparison against a passcode.
    pub fn equals(&self, other: &str) -> bool {
        self.symbols.iter().copied().eq(other.chars())
    }

    pub fn as_string(&self) -> String {
        self.symbols.iter().collect()
    }
}

impl Display for InputBuffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for c in &self.symbols {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sixteenth_symbol_is_rejected_without_mutation() {
        let mut buffer = InputBuffer::new();
        for _ in 0..PASSCODE_MAX_LEN {
            buffer.append('7').unwrap();
        }
        let before = buffer.clone();
        assert_eq!(buffer.append('1'), Err(BufferError::Overflow));
        assert_eq!(buffer, before);
        assert_eq!(buffer.len(), PASSCODE_MAX_LEN);
    }

    #[test]
    fn equals_is_exact() {
        let mut buffer = InputBuffer::new();
        for c in "123".chars() {
            buffer.append(c).unwrap();
        }
        assert!(buffer.equals("123"));
        assert!(!buffer.equals("1234"));
        assert!(!buffer.equals("12"));
        assert!(!buffer.equals(""));
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.equals(""));
    }

    #[test]
    fn display_shows_contents() {
        let mut buffer = InputBuffer::new();
        buffer.append('4').unwrap();
        buffer.append('2').unwrap();
        assert_eq!(buffer.to_string(), "42");
        assert_eq!(buffer.as_string(), "42");
    }

    proptest! {
        #[test]
        fn length_never_exceeds_capacity(digits in prop::collection::vec(0u32..10, 0..64)) {
            let mut buffer = InputBuffer::new();
            for (i, d) in digits.iter().enumerate() {
                let c = char::from_digit(*d, 10).unwrap();
                let result = buffer.append(c);
                prop_assert_eq!(result.is_ok(), i < PASSCODE_MAX_LEN);
                prop_assert!(buffer.len() <= PASSCODE_MAX_LEN);
            }
            let kept: String = digits
                .iter()
                .take(PASSCODE_MAX_LEN)
                .map(|d| char::from_digit(*d, 10).unwrap())
                .collect();
            prop_assert!(buffer.equals(&kept));
        }
    }
}
