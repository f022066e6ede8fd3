use std::fmt::{Debug, Formatter};
use log::trace;
use crate::debounce::ConfirmDebounce;
use crate::delay::Delay;
use crate::{GpioInput, GpioOutput, GpioResult};
use super::{COLS, Keypad, KeypadKey, ROWS};

const POSITIONS: usize = ROWS * COLS;

/// The `GpioKeypad` struct represents a GPIO-based keypad with 3 columns and 4 rows.
///
/// Columns are driven one at a time and the rows are sampled while their column is
/// active. Positions are visited column-major (`(0,0), (1,0), ... (3,2)`), and the scan
/// resumes where the previous [Keypad::poll] left off, so a key that is still held when
/// it gets reported is not seen again until every other position has been visited.
pub struct GpioKeypad<'a> {
    cols: [&'a dyn GpioOutput; COLS],
    rows: [&'a dyn GpioInput; ROWS],
    delay: &'a dyn Delay,
    debounce: ConfirmDebounce,
    cursor: usize,
}

impl Debug for GpioKeypad<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpioKeypad({:?}, {:?})", self.cols, self.rows)
    }
}

impl <'a> GpioKeypad<'a> {
    /// Creates a new `GpioKeypad` with the column outputs and row inputs in layout order.
    ///
    /// All columns are driven inactive before returning.
    pub fn new(
        cols: [&'a dyn GpioOutput; COLS],
        rows: [&'a dyn GpioInput; ROWS],
        delay: &'a dyn Delay,
    ) -> GpioResult<Self> {
        for col in cols {
            col.write(false)?;
        }

        Ok(GpioKeypad {
            cols,
            rows,
            delay,
            debounce: ConfirmDebounce::default(),
            cursor: 0,
        })
    }

    pub fn with_debounce(mut self, debounce: ConfirmDebounce) -> Self {
        self.debounce = debounce;
        self
    }

    /// Drives `col` active and every other column inactive.
    fn select(&self, col: usize) -> GpioResult<()> {
        for (i, line) in self.cols.iter().enumerate() {
            line.write(i == col)?;
        }
        Ok(())
    }
}

impl Keypad for GpioKeypad<'_> {
    type Key = KeypadKey;

    fn poll(&mut self) -> GpioResult<Option<Self::Key>> {
        let mut selected = None;

        for step in 0..POSITIONS {
            let pos = (self.cursor + step) % POSITIONS;
            let (col, row) = (pos / ROWS, pos % ROWS);

            if selected != Some(col) {
                if let Some(prev) = selected {
                    self.cols[prev].write(false)?;
                }
                self.select(col)?;
                selected = Some(col);
            }

            if self.debounce.confirm(self.rows[row], self.delay)? {
                self.cols[col].write(false)?;
                self.cursor = (pos + 1) % POSITIONS;

                let key = KeypadKey::from_position((row, col));
                trace!("Confirmed press at row {} col {}: {:?}", row, col, key);
                return Ok(key);
            }
        }

        if let Some(col) = selected {
            self.cols[col].write(false)?;
        }

        Ok(None)
    }
}
