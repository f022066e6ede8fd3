//! Time suspension used by debouncing and feedback patterns.

use std::fmt::Debug;
use std::thread;
use std::time::Duration;

/// Suspends the caller for a while.
///
/// Everything that waits on wall-clock time goes through this trait, so the keypad
/// and the LED patterns can be driven by [crate::mock::MockClock] in tests.
pub trait Delay: Debug {
    fn delay(&self, duration: Duration);
}

/// [Delay] backed by [thread::sleep].
#[derive(Copy, Clone, Debug, Default)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay(&self, duration: Duration) {
        thread::sleep(duration);
    }
}
