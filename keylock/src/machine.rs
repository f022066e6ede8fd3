//! The passcode workflow: verifying input and changing the stored passcode.

use log::{debug, info, warn};
use keylock_gpio::keypad::KeypadKey;
use crate::buffer::{BufferError, InputBuffer};
use crate::feedback::{Feedback, FeedbackSink};
use crate::store::{PASSCODE_KEY, PasscodeStore, StoreError, load_passcode};

/// Which meaning the next control key has.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum WorkflowState {
    /// Typed digits are checked against the passcode on `#`.
    #[default]
    Idle,
    /// A change was requested; `*` checks the typed digits against the current passcode.
    AwaitingOldPasscode,
    /// The old passcode was accepted; `#` stores the typed digits as the new one.
    AwaitingNewPasscode,
}

/// Consumes keys one at a time and drives the store and the feedback sink.
///
/// `#` verifies (or, on empty input in [WorkflowState::Idle], starts a change) and `*`
/// clears. During a change, `*` is what confirms the old passcode; a `#` at that point
/// is just a regular verification and does not move the change along. Once past the
/// old passcode there is no way back to [WorkflowState::Idle] except storing a new one.
#[derive(Debug)]
pub struct PasscodeMachine<S: PasscodeStore, F: FeedbackSink> {
    store: S,
    feedback: F,
    state: WorkflowState,
    buffer: InputBuffer,
    passcode: String,
}

impl<S: PasscodeStore, F: FeedbackSink> PasscodeMachine<S, F> {
    /// Loads the passcode from `store` (writing the default if there is none).
    pub fn new(mut store: S, feedback: F) -> Result<Self, StoreError> {
        let passcode = load_passcode(&mut store)?;
        debug!("Passcode is {:?}.", passcode);

        Ok(PasscodeMachine {
            store,
            feedback,
            state: WorkflowState::default(),
            buffer: InputBuffer::new(),
            passcode,
        })
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn buffer(&self) -> &InputBuffer {
        &self.buffer
    }

    #[cfg(test)]
    pub fn passcode(&self) -> &str {
        &self.passcode
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[cfg(test)]
    pub fn feedback(&self) -> &F {
        &self.feedback
    }

    /// Handles a single key press.
    pub fn step(&mut self, key: KeypadKey) {
        match key {
            KeypadKey::KeyAsterisk => self.on_asterisk(),
            KeypadKey::KeyHash => self.on_hash(),
            key => {
                if let Some(digit) = key.digit() {
                    self.on_digit(digit);
                }
            }
        }
    }

    fn on_digit(&mut self, digit: char) {
        match self.buffer.append(digit) {
            Ok(()) => debug!("Input: {}", self.buffer),
            Err(BufferError::Overflow) => {
                info!("Input too long ({} symbols), press * to clear.", self.buffer.len());
                debug!("Input: {}", self.buffer);
                self.signal(Feedback::TooLong);
            }
        }
    }

    fn on_asterisk(&mut self) {
        if self.state == WorkflowState::AwaitingOldPasscode {
            let matches = self.buffer.equals(&self.passcode);
            self.buffer.clear();
            if matches {
                info!("Old passcode accepted, enter the new one.");
                self.signal(Feedback::OldConfirmed);
                self.transition(WorkflowState::AwaitingNewPasscode);
            } else {
                warn!("Current passcode is wrong.");
                self.signal(Feedback::Failure);
                self.transition(WorkflowState::Idle);
            }
            return;
        }

        self.buffer.clear();
        info!("Input cleared.");
        self.signal(Feedback::Cleared);
    }

    fn on_hash(&mut self) {
        match self.state {
            WorkflowState::Idle if self.buffer.is_empty() => {
                info!("Passcode change requested, enter the current passcode.");
                self.transition(WorkflowState::AwaitingOldPasscode);
            }
            WorkflowState::AwaitingNewPasscode => self.change_passcode(),
            WorkflowState::Idle | WorkflowState::AwaitingOldPasscode => self.verify(),
        }
    }

    fn verify(&mut self) {
        debug!("Checking input {}", self.buffer);
        if self.buffer.equals(&self.passcode) {
            info!("Correct passcode.");
            self.signal(Feedback::Success);
        } else {
            warn!("Wrong passcode entered: {}", self.buffer);
            self.signal(Feedback::Failure);
        }
        self.buffer.clear();
    }

    fn change_passcode(&mut self) {
        if self.buffer.is_empty() {
            warn!("Refusing to store an empty passcode.");
            self.signal(Feedback::Failure);
            return;
        }

        self.passcode = self.buffer.as_string();
        self.buffer.clear();
        info!("Passcode changed.");
        debug!("New passcode: {}", self.passcode);

        if let Err(e) = self.persist() {
            warn!("Failed to persist the new passcode: {}", e);
        }

        self.signal(Feedback::Changed);
        self.transition(WorkflowState::Idle);
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        self.store.set(PASSCODE_KEY, &self.passcode)?;
        self.store.commit()
    }

    fn signal(&mut self, feedback: Feedback) {
        if let Err(e) = self.feedback.emit(feedback) {
            warn!("Failed to show {:?} feedback: {}", feedback, e);
        }
    }

    fn transition(&mut self, next: WorkflowState) {
        if self.state != next {
            debug!("State {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}
