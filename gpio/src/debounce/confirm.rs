use std::time::Duration;
use crate::delay::Delay;
use crate::{GpioInput, GpioResult};

/// Debounces a contact by re-sampling it after two delays.
///
/// A line that reads active is only accepted if it still reads active after `settle`
/// and again after a further `hold`. Anything shorter than `settle + hold` is treated
/// as bounce.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ConfirmDebounce {
    pub settle: Duration,
    pub hold: Duration,
}

impl Default for ConfirmDebounce {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(30),
            hold: Duration::from_millis(120),
        }
    }
}

impl ConfirmDebounce {
    pub fn with_delays(mut self, settle: Duration, hold: Duration) -> Self {
        self.settle = settle;
        self.hold = hold;
        self
    }

    /// The shortest closure that can be accepted.
    pub fn window(&self) -> Duration {
        self.settle + self.hold
    }

    /// Samples `input` and, if it is active, confirms it through both delays.
    ///
    /// Returns early without suspending when the first sample is inactive.
    pub fn confirm(&self, input: &dyn GpioInput, delay: &dyn Delay) -> GpioResult<bool> {
        if !input.read()? {
            return Ok(false);
        }

        for wait in [self.settle, self.hold] {
            delay.delay(wait);
            if !input.read()? {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GpioOutput;
    use crate::keypad::KeypadKey;
    use crate::mock::{MockClock, MockMatrix};
    use proptest::prelude::*;

    fn pressed_line(hold_ms: u64) -> (MockClock, MockMatrix) {
        let clock = MockClock::new();
        let matrix = MockMatrix::new(clock.clone());
        matrix.column(0).write(true).unwrap();
        matrix.press(KeypadKey::Key1, Duration::from_millis(hold_ms));
        (clock, matrix)
    }

    #[test]
    fn idle_line_does_not_wait() {
        let clock = MockClock::new();
        let matrix = MockMatrix::new(clock.clone());
        let confirmed = ConfirmDebounce::default().confirm(&matrix.row(0), &clock).unwrap();
        assert!(!confirmed);
        assert_eq!(clock.now(), Duration::ZERO);
        assert_eq!(matrix.reads(), 1);
    }

    #[test]
    fn held_key_is_confirmed_after_both_delays() {
        let (clock, matrix) = pressed_line(1000);
        let confirmed = ConfirmDebounce::default().confirm(&matrix.row(0), &clock).unwrap();
        assert!(confirmed);
        assert_eq!(clock.now(), Duration::from_millis(150));
        assert_eq!(matrix.reads(), 3);
    }

    #[test]
    fn bounce_released_before_settle_is_rejected() {
        let (clock, matrix) = pressed_line(10);
        let confirmed = ConfirmDebounce::default().confirm(&matrix.row(0), &clock).unwrap();
        assert!(!confirmed);
        assert_eq!(clock.now(), Duration::from_millis(30));
    }

    #[test]
    fn custom_delays() {
        let debounce = ConfirmDebounce::default()
            .with_delays(Duration::from_millis(5), Duration::from_millis(5));
        assert_eq!(debounce.window(), Duration::from_millis(10));
        let (clock, matrix) = pressed_line(11);
        assert!(debounce.confirm(&matrix.row(0), &clock).unwrap());
    }

    proptest! {
        #[test]
        fn closure_shorter_than_window_never_confirms(hold_ms in 0u64..=150) {
            let (clock, matrix) = pressed_line(hold_ms);
            let confirmed = ConfirmDebounce::default().confirm(&matrix.row(0), &clock).unwrap();
            prop_assert!(!confirmed);
        }

        #[test]
        fn closure_longer_than_window_confirms(hold_ms in 151u64..5000) {
            let (clock, matrix) = pressed_line(hold_ms);
            let confirmed = ConfirmDebounce::default().confirm(&matrix.row(0), &clock).unwrap();
            prop_assert!(confirmed);
        }
    }
}
