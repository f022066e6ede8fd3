//! Hardware-facing side of the keylock: GPIO lines, time suspension, debouncing and the
//! matrix keypad scanner built on top of them.

pub mod debounce;
pub mod delay;
pub mod gpiod;
pub mod keypad;
pub mod mock;
pub mod raw;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("line already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported on this backend")]
    NotSupported,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

/// A source of GPIO lines, addressed by their chip-level index (BCM number on a Pi).
pub trait GpioDriver: Debug {
    /// Gets the amount of lines the driver can hand out.
    fn count(&self) -> GpioResult<usize>;

    /// Claims the line at the given index.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the index is out of range.
    /// - `GpioError::AlreadyInUse` if the line is still claimed by someone else.
    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>>;
}

/// Specifies the active level of a line.
///
/// Keypad rows are pulled up and read as active when pulled low by a pressed key,
/// so they are configured with [GpioActiveLevel::Low] and the scanner only ever
/// deals with "active" and "inactive".
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioActiveLevel {
    #[default] High,
    Low,
}

impl GpioActiveLevel {
    /// Maps a logical value to the electrical level (and back, the mapping is symmetric).
    pub fn get_state(&self, value: bool) -> bool {
        match self {
            GpioActiveLevel::High => value,
            GpioActiveLevel::Low => !value,
        }
    }
}

/// Specifies the bias (pull resistors) of a line.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioBias {
    #[default] None,
    PullUp,
    PullDown,
}

/// Specifies the drive mode of an output line.
///
/// Open-drain leaves the line floating instead of driving it high, which lets several
/// column lines share a row without fighting each other when two keys are held.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioDriveMode {
    /// Line is driven high or low with low impedance.
    #[default] PushPull,
    /// Line is driven low or left floating when high.
    OpenDrain,
    /// Line is driven high or left floating when low.
    OpenSource,
}

impl GpioDriveMode {
    /// Gets the electrical output for the given level.
    ///
    /// # Returns
    /// - `Some(level)` if the line will be driven.
    /// - `None` if the line will be left floating.
    pub fn get_state(&self, value: bool) -> Option<bool> {
        match (self, value) {
            (GpioDriveMode::PushPull, value) => Some(value),
            (GpioDriveMode::OpenDrain, true) | (GpioDriveMode::OpenSource, false) => None,
            (_, value) => Some(value),
        }
    }
}

/// A claimed line that has not been given a direction yet.
pub trait GpioPin: Debug {
    /// Turns the line into an input.
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioInput + '_>>;
    /// Turns the line into an output.
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>>;

    /// Sets the active level of the line.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if the backend cannot invert the line.
    fn set_active_level(&mut self, _level: GpioActiveLevel) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }

    /// Sets the bias of the line.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if the backend has no pull resistor control.
    fn set_bias(&mut self, _bias: GpioBias) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }

    /// Sets the drive mode of the line.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if the backend only does push-pull.
    fn set_drive_mode(&mut self, _mode: GpioDriveMode) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }
}

pub trait GpioInput: Debug {
    /// Reads the logical state of the line (active level already applied).
    fn read(&self) -> GpioResult<bool>;
}

pub trait GpioOutput: Debug {
    /// Writes the logical state of the line (active level already applied).
    fn write(&self, value: bool) -> GpioResult<()>;
}
