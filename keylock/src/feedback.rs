//! User-facing outcome signals and the two-LED sink that displays them.

use std::fmt::Debug;
use std::time::Duration;
use log::trace;
use keylock_gpio::delay::Delay;
use keylock_gpio::{GpioOutput, GpioResult};

/// Discrete outcomes the lock reports to the user.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Feedback {
    /// Entered passcode matched.
    Success,
    /// Entered passcode did not match, or the new passcode was refused.
    Failure,
    /// Old passcode accepted, the new one can be typed.
    OldConfirmed,
    /// New passcode stored.
    Changed,
    /// Input discarded with `*`.
    Cleared,
    /// A digit was dropped because the input is full.
    TooLong,
}

pub trait FeedbackSink: Debug {
    fn emit(&mut self, feedback: Feedback) -> GpioResult<()>;
}

/// One step of an [LedPattern]: which LEDs are lit and for how long.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LedStep {
    pub green: bool,
    pub red: bool,
    pub duration: Duration,
}

const fn step(green: bool, red: bool, ms: u64) -> LedStep {
    LedStep { green, red, duration: Duration::from_millis(ms) }
}

/// A blink sequence, played from start to end before returning to rest.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LedPattern(pub Vec<LedStep>);

impl LedPattern {
    pub fn for_feedback(feedback: Feedback) -> LedPattern {
        let steps = match feedback {
            Feedback::Success => vec![step(true, false, 2000)],
            Feedback::Failure => vec![step(false, false, 500)],
            Feedback::OldConfirmed => [step(true, false, 250), step(false, false, 250)].repeat(2),
            Feedback::Changed => [step(true, false, 200), step(false, true, 200)].repeat(3),
            Feedback::Cleared => vec![step(false, false, 100)],
            Feedback::TooLong => [step(false, true, 100), step(false, false, 100)].repeat(3),
        };
        LedPattern(steps)
    }

    pub fn duration(&self) -> Duration {
        self.0.iter().map(|s| s.duration).sum()
    }
}

/// Shows feedback on a green and a red LED.
///
/// At rest the red LED is lit. Patterns are played synchronously, so the caller is
/// suspended for the pattern's whole length.
pub struct LedFeedback<'a> {
    green: &'a dyn GpioOutput,
    red: &'a dyn GpioOutput,
    delay: &'a dyn Delay,
}

impl Debug for LedFeedback<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedFeedback(green: {:?}, red: {:?})", self.green, self.red)
    }
}

impl<'a> LedFeedback<'a> {
    pub fn new(green: &'a dyn GpioOutput, red: &'a dyn GpioOutput, delay: &'a dyn Delay) -> Self {
        LedFeedback { green, red, delay }
    }

    fn show(&self, green: bool, red: bool) -> GpioResult<()> {
        self.green.write(green)?;
        self.red.write(red)
    }

    /// Puts the LEDs in their resting state.
    pub fn rest(&self) -> GpioResult<()> {
        self.show(false, true)
    }

    pub fn play(&self, pattern: &LedPattern) -> GpioResult<()> {
        for step in &pattern.0 {
            self.show(step.green, step.red)?;
            self.delay.delay(step.duration);
        }
        self.rest()
    }
}

impl FeedbackSink for LedFeedback<'_> {
    fn emit(&mut self, feedback: Feedback) -> GpioResult<()> {
        let pattern = LedPattern::for_feedback(feedback);
        trace!("Playing {:?} for {:?}", feedback, pattern.duration());
        self.play(&pattern)
    }
}

/// Sink that only remembers what it was asked to show.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingFeedback {
    pub emitted: Vec<Feedback>,
}

#[cfg(test)]
impl FeedbackSink for RecordingFeedback {
    fn emit(&mut self, feedback: Feedback) -> GpioResult<()> {
        self.emitted.push(feedback);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keylock_gpio::mock::{BrokenOutput, MockClock, MockOutput};

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn success_lights_green_for_two_seconds() {
        let clock = MockClock::new();
        let green = MockOutput::new(clock.clone());
        let red = MockOutput::new(clock.clone());
        let mut leds = LedFeedback::new(&green, &red, &clock);

        leds.emit(Feedback::Success).unwrap();

        assert_eq!(clock.now(), 2000 * MS);
        assert_eq!(green.active_for(), 2000 * MS);
        assert!(!green.level());
        assert!(red.level());
    }

    #[test]
    fn failure_turns_red_off_for_half_a_second() {
        let clock = MockClock::new();
        let green = MockOutput::new(clock.clone());
        let red = MockOutput::new(clock.clone());
        let mut leds = LedFeedback::new(&green, &red, &clock);
        leds.rest().unwrap();

        leds.emit(Feedback::Failure).unwrap();

        assert_eq!(clock.now(), 500 * MS);
        assert_eq!(red.history(), vec![(Duration::ZERO, true), (Duration::ZERO, false), (500 * MS, true)]);
        assert_eq!(green.active_for(), Duration::ZERO);
    }

    #[test]
    fn changed_alternates_the_leds() {
        let clock = MockClock::new();
        let green = MockOutput::new(clock.clone());
        let red = MockOutput::new(clock.clone());
        let mut leds = LedFeedback::new(&green, &red, &clock);

        leds.emit(Feedback::Changed).unwrap();

        assert_eq!(clock.now(), 1200 * MS);
        assert_eq!(green.active_for(), 600 * MS);
    }

    #[test]
    fn every_pattern_ends_at_rest() {
        for feedback in [
            Feedback::Success,
            Feedback::Failure,
            Feedback::OldConfirmed,
            Feedback::Changed,
            Feedback::Cleared,
            Feedback::TooLong,
        ] {
            let clock = MockClock::new();
            let green = MockOutput::new(clock.clone());
            let red = MockOutput::new(clock.clone());
            let mut leds = LedFeedback::new(&green, &red, &clock);
            leds.emit(feedback).unwrap();
            assert_eq!(clock.now(), LedPattern::for_feedback(feedback).duration());
            assert!(!green.level() && red.level(), "{:?} did not rest", feedback);
        }
    }

    #[test]
    fn broken_led_is_reported() {
        let clock = MockClock::new();
        let red = MockOutput::new(clock.clone());
        let mut leds = LedFeedback::new(&BrokenOutput, &red, &clock);
        assert!(leds.emit(Feedback::Cleared).is_err());
    }
}
