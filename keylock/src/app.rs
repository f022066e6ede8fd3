//! The module for the main app loop step.

use log::debug;
use keylock_gpio::GpioResult;
use keylock_gpio::keypad::{Keypad, KeypadKey};
use crate::feedback::FeedbackSink;
use crate::machine::PasscodeMachine;
use crate::store::PasscodeStore;

/// Ties the keypad to the passcode workflow.
pub struct App<'a, S: PasscodeStore, F: FeedbackSink> {
    keypad: &'a mut dyn Keypad<Key = KeypadKey>,
    machine: PasscodeMachine<S, F>,
}

impl<'a, S: PasscodeStore, F: FeedbackSink> App<'a, S, F> {
    pub fn new(keypad: &'a mut dyn Keypad<Key = KeypadKey>, machine: PasscodeMachine<S, F>) -> Self {
        App { keypad, machine }
    }

    #[cfg(test)]
    pub fn machine(&self) -> &PasscodeMachine<S, F> {
        &self.machine
    }

    /// Polls the keypad once and feeds a confirmed key to the workflow.
    ///
    /// Returns the key that was handled, if any. Only keypad errors are returned;
    /// everything past the keypad is handled inside the workflow.
    pub fn update(&mut self) -> GpioResult<Option<KeypadKey>> {
        let key = self.keypad.poll()?;
        if let Some(key) = key {
            debug!("Key {} pressed.", key.to_char());
            self.machine.step(key);
            debug!("State {:?}, input {:?}", self.machine.state(), self.machine.buffer().as_string());
        }
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use keylock_gpio::delay::Delay;
    use keylock_gpio::keypad::GpioKeypad;
    use keylock_gpio::mock::{BrokenInput, MockClock, MockMatrix, MockOutput};
    use keylock_gpio::{GpioError, GpioInput, GpioOutput};
    use crate::feedback::{Feedback, LedFeedback, RecordingFeedback};
    use crate::machine::WorkflowState;
    use crate::store::{MemoryStore, PASSCODE_KEY};

    const MS: Duration = Duration::from_millis(1);

    /// Presses each key for 300 ms and runs the loop until it is handled, then waits
    /// for the release like a person would.
    fn type_keys<S: PasscodeStore, F: FeedbackSink>(
        app: &mut App<'_, S, F>,
        matrix: &MockMatrix,
        clock: &MockClock,
        keys: &str,
    ) {
        for c in keys.chars() {
            let key = KeypadKey::from_char(c).unwrap();
            matrix.press(key, 300 * MS);
            let handled = (0..10).find_map(|_| app.update().unwrap());
            assert_eq!(handled, Some(key));
            clock.delay(300 * MS);
            assert_eq!(app.update().unwrap(), None);
        }
    }

    #[test]
    fn keys_flow_from_matrix_to_workflow() {
        let clock = MockClock::new();
        let matrix = MockMatrix::new(clock.clone());
        let cols = matrix.columns();
        let rows = matrix.rows();
        let mut keypad = GpioKeypad::new(
            cols.each_ref().map(|c| c as &dyn GpioOutput),
            rows.each_ref().map(|r| r as &dyn GpioInput),
            &clock,
        )
        .unwrap();
        let machine = PasscodeMachine::new(MemoryStore::default(), RecordingFeedback::default()).unwrap();
        let mut app = App::new(&mut keypad, machine);

        type_keys(&mut app, &matrix, &clock, "#1234*5678#");

        assert_eq!(app.machine().state(), WorkflowState::Idle);
        assert_eq!(app.machine().store().committed(PASSCODE_KEY), Some("5678"));
        assert_eq!(app.machine().feedback().emitted, [Feedback::OldConfirmed, Feedback::Changed]);
    }

    #[test]
    fn bounce_never_reaches_the_workflow() {
        let clock = MockClock::new();
        let matrix = MockMatrix::new(clock.clone());
        let cols = matrix.columns();
        let rows = matrix.rows();
        let mut keypad = GpioKeypad::new(
            cols.each_ref().map(|c| c as &dyn GpioOutput),
            rows.each_ref().map(|r| r as &dyn GpioInput),
            &clock,
        )
        .unwrap();
        let machine = PasscodeMachine::new(MemoryStore::default(), RecordingFeedback::default()).unwrap();
        let mut app = App::new(&mut keypad, machine);

        matrix.press(KeypadKey::Key7, 25 * MS);
        for _ in 0..5 {
            assert_eq!(app.update().unwrap(), None);
        }
        assert!(app.machine().buffer().is_empty());
    }

    #[test]
    fn keypad_errors_stop_the_update() {
        let clock = MockClock::new();
        let matrix = MockMatrix::new(clock.clone());
        let cols = matrix.columns();
        let rows = matrix.rows();
        let mut keypad = GpioKeypad::new(
            cols.each_ref().map(|c| c as &dyn GpioOutput),
            [&rows[0] as &dyn GpioInput, &rows[1], &BrokenInput, &rows[3]],
            &clock,
        )
        .unwrap();
        let machine = PasscodeMachine::new(MemoryStore::default(), RecordingFeedback::default()).unwrap();
        let mut app = App::new(&mut keypad, machine);

        assert_eq!(app.update(), Err(GpioError::Io(std::io::ErrorKind::BrokenPipe)));
        assert!(app.machine().feedback().emitted.is_empty());
    }

    #[test]
    fn keys_pressed_during_feedback_are_lost() {
        let clock = MockClock::new();
        let matrix = MockMatrix::new(clock.clone());
        let cols = matrix.columns();
        let rows = matrix.rows();
        let green = MockOutput::new(clock.clone());
        let red = MockOutput::new(clock.clone());
        let mut keypad = GpioKeypad::new(
            cols.each_ref().map(|c| c as &dyn GpioOutput),
            rows.each_ref().map(|r| r as &dyn GpioInput),
            &clock,
        )
        .unwrap();
        let leds = LedFeedback::new(&green, &red, &clock);
        let machine = PasscodeMachine::new(MemoryStore::default(), leds).unwrap();
        let mut app = App::new(&mut keypad, machine);

        type_keys(&mut app, &matrix, &clock, "1234");
        // `#` plays the 2 s success pattern; a 5 pressed and released within it is never sampled.
        let start = clock.now();
        matrix.press(KeypadKey::KeyHash, 300 * MS);
        matrix.press_between(KeypadKey::Key5, start + 1000 * MS, start + 1500 * MS);
        assert_eq!((0..10).find_map(|_| app.update().unwrap()), Some(KeypadKey::KeyHash));
        assert!(clock.now() >= start + 2000 * MS);
        assert_eq!(green.active_for(), 2000 * MS);

        for _ in 0..5 {
            assert_eq!(app.update().unwrap(), None);
        }
        assert!(app.machine().buffer().is_empty());
    }
}
