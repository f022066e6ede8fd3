use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use keylock_gpio::keypad::{COLS, ROWS};
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    #[error("{name}: invalid value {value:?}")]
    InvalidValue { name: &'static str, value: String },
    #[error("{name}: expected {expected} pins, got {got}")]
    PinCount { name: &'static str, expected: usize, got: usize },
}

/// How GPIO lines are accessed.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioBackend {
    /// Register block through `/dev/gpiomem`.
    #[default]
    GpioMem,
    /// Register block through `/dev/mem` (needs root).
    Mem,
    /// Linux GPIO character device.
    Gpiod,
}

impl FromStr for GpioBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gpiomem" => Ok(GpioBackend::GpioMem),
            "mem" => Ok(GpioBackend::Mem),
            "gpiod" => Ok(GpioBackend::Gpiod),
            _ => Err(()),
        }
    }
}

/// Runtime settings, read from the environment (and `.env`).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Settings {
    pub keypad_rows: [usize; ROWS],
    pub keypad_cols: [usize; COLS],
    pub led_green: usize,
    pub led_red: usize,
    pub backend: GpioBackend,
    pub gpio_chip: PathBuf,
    pub store_file: PathBuf,
    pub poll_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            keypad_rows: [19, 14, 12, 5],
            keypad_cols: [23, 18, 13],
            led_green: 25,
            led_red: 26,
            backend: GpioBackend::default(),
            gpio_chip: PathBuf::from("/dev/gpiochip0"),
            store_file: PathBuf::from("keylock.json"),
            poll_interval: Duration::from_millis(10),
        }
    }
}

fn parse_pin_bus<const N: usize>(name: &'static str, pin_str: &str) -> Result<[usize; N], ConfigError> {
    let pins = pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect::<Result<Vec<usize>, _>>()
        .map_err(|_| ConfigError::InvalidValue { name, value: pin_str.to_string() })?;
    let got = pins.len();
    pins.try_into()
        .map_err(|_| ConfigError::PinCount { name, expected: N, got })
}

fn parse<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { name, value: value.to_string() })
}

impl Settings {
    /// Reads the settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the settings through `lookup`, falling back to the defaults for unset names.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();

        if let Some(v) = lookup("KEYLOCK_KEYPAD_PINS_ROWS") {
            settings.keypad_rows = parse_pin_bus("KEYLOCK_KEYPAD_PINS_ROWS", &v)?;
        }
        if let Some(v) = lookup("KEYLOCK_KEYPAD_PINS_COLS") {
            settings.keypad_cols = parse_pin_bus("KEYLOCK_KEYPAD_PINS_COLS", &v)?;
        }
        if let Some(v) = lookup("KEYLOCK_LED_PIN_GREEN") {
            settings.led_green = parse("KEYLOCK_LED_PIN_GREEN", &v)?;
        }
        if let Some(v) = lookup("KEYLOCK_LED_PIN_RED") {
            settings.led_red = parse("KEYLOCK_LED_PIN_RED", &v)?;
        }
        if let Some(v) = lookup("KEYLOCK_GPIO_BACKEND") {
            settings.backend = parse("KEYLOCK_GPIO_BACKEND", &v)?;
        }
        if let Some(v) = lookup("KEYLOCK_GPIO_CHIP") {
            settings.gpio_chip = PathBuf::from(v);
        }
        if let Some(v) = lookup("KEYLOCK_STORE_FILE") {
            settings.store_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("KEYLOCK_POLL_INTERVAL_MS") {
            settings.poll_interval = Duration::from_millis(parse("KEYLOCK_POLL_INTERVAL_MS", &v)?);
        }

        Ok(settings)
    }
}
