//! Simulated hardware for running the keypad and feedback code without a board.
//!
//! Time is virtual: a [MockClock] only moves when something calls [Delay::delay] on it
//! (or [MockClock::advance]), so a debounce window of 150 ms costs nothing in a test.
//! A [MockMatrix] models the 4×3 keypad: each press closes the contact between one row
//! and one column for a span of virtual time, and a row reads active only while its
//! pressed column is being driven.

use crate::delay::Delay;
use crate::keypad::{COLS, KeypadKey, ROWS};
use crate::{GpioError, GpioInput, GpioOutput, GpioResult};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

/// Virtual clock shared by every mock built from it.
#[derive(Clone, Debug, Default)]
pub struct MockClock {
    now: Rc<Cell<Duration>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now.get()
    }

    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }
}

impl Delay for MockClock {
    fn delay(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// A contact closure between `row` and `col` during `from..until`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MockPress {
    pub row: usize,
    pub col: usize,
    pub from: Duration,
    pub until: Duration,
}

impl MockPress {
    fn closed_at(&self, now: Duration) -> bool {
        self.from <= now && now < self.until
    }
}

#[derive(Debug, Default)]
struct MatrixState {
    driven: [bool; COLS],
    presses: Vec<MockPress>,
    reads: usize,
}

/// Simulated keypad matrix.
#[derive(Clone, Debug)]
pub struct MockMatrix {
    clock: MockClock,
    state: Rc<RefCell<MatrixState>>,
}

impl MockMatrix {
    pub fn new(clock: MockClock) -> Self {
        MockMatrix {
            clock,
            state: Rc::default(),
        }
    }

    /// Holds `key` down from now for `hold`.
    pub fn press(&self, key: KeypadKey, hold: Duration) {
        let now = self.clock.now();
        self.press_between(key, now, now + hold);
    }

    /// Holds `key` down during `from..until` of virtual time.
    pub fn press_between(&self, key: KeypadKey, from: Duration, until: Duration) {
        let (row, col) = key.position();
        self.state.borrow_mut().presses.push(MockPress { row, col, from, until });
    }

    /// Which columns are currently driven active.
    pub fn driven_columns(&self) -> [bool; COLS] {
        self.state.borrow().driven
    }

    /// How many row samples have been taken so far.
    pub fn reads(&self) -> usize {
        self.state.borrow().reads
    }

    pub fn row(&self, row: usize) -> MockRow {
        MockRow { matrix: self.clone(), row }
    }

    pub fn column(&self, col: usize) -> MockColumn {
        MockColumn { matrix: self.clone(), col }
    }

    /// All row lines in order.
    pub fn rows(&self) -> [MockRow; ROWS] {
        std::array::from_fn(|row| self.row(row))
    }

    /// All column lines in order.
    pub fn columns(&self) -> [MockColumn; COLS] {
        std::array::from_fn(|col| self.column(col))
    }
}

/// Row line of a [MockMatrix].
#[derive(Debug)]
pub struct MockRow {
    matrix: MockMatrix,
    row: usize,
}

impl GpioInput for MockRow {
    fn read(&self) -> GpioResult<bool> {
        let now = self.matrix.clock.now();
        let mut state = self.matrix.state.borrow_mut();
        state.reads += 1;
        if self.row >= ROWS {
            return Err(GpioError::InvalidArgument);
        }
        let state = &*state;
        Ok(state
            .presses
            .iter()
            .any(|p| p.row == self.row && state.driven[p.col] && p.closed_at(now)))
    }
}

/// Column line of a [MockMatrix].
#[derive(Debug)]
pub struct MockColumn {
    matrix: MockMatrix,
    col: usize,
}

impl GpioOutput for MockColumn {
    fn write(&self, value: bool) -> GpioResult<()> {
        let mut state = self.matrix.state.borrow_mut();
        let driven = state.driven.get_mut(self.col).ok_or(GpioError::InvalidArgument)?;
        *driven = value;
        Ok(())
    }
}

/// Output line that remembers every write together with the virtual time it happened at.
#[derive(Clone, Debug)]
pub struct MockOutput {
    clock: MockClock,
    history: Rc<RefCell<Vec<(Duration, bool)>>>,
}

impl MockOutput {
    pub fn new(clock: MockClock) -> Self {
        MockOutput {
            clock,
            history: Rc::default(),
        }
    }

    /// Last written level, `false` if never written.
    pub fn level(&self) -> bool {
        self.history.borrow().last().is_some_and(|&(_, level)| level)
    }

    pub fn history(&self) -> Vec<(Duration, bool)> {
        self.history.borrow().clone()
    }

    /// Total time the line spent active between the first write and now.
    pub fn active_for(&self) -> Duration {
        let history = self.history.borrow();
        let mut total = Duration::ZERO;
        for (i, &(at, level)) in history.iter().enumerate() {
            if !level {
                continue;
            }
            let end = history.get(i + 1).map_or(self.clock.now(), |&(next, _)| next);
            total += end - at;
        }
        total
    }
}

impl GpioOutput for MockOutput {
    fn write(&self, value: bool) -> GpioResult<()> {
        self.history.borrow_mut().push((self.clock.now(), value));
        Ok(())
    }
}

/// Output line that fails every write, for exercising error paths.
#[derive(Copy, Clone, Debug, Default)]
pub struct BrokenOutput;

impl GpioOutput for BrokenOutput {
    fn write(&self, _value: bool) -> GpioResult<()> {
        Err(GpioError::Io(std::io::ErrorKind::BrokenPipe))
    }
}

/// Input line that fails every read.
#[derive(Copy, Clone, Debug, Default)]
pub struct BrokenInput;

impl GpioInput for BrokenInput {
    fn read(&self) -> GpioResult<bool> {
        Err(GpioError::Io(std::io::ErrorKind::BrokenPipe))
    }
}
