mod app;
mod buffer;
mod config;
mod feedback;
mod machine;
mod store;

use dotenv::dotenv;
use log::{debug, info};
use sysinfo::System;
use keylock_gpio::delay::{Delay, ThreadDelay};
use keylock_gpio::gpiod::GpiodDriver;
use keylock_gpio::keypad::GpioKeypad;
use keylock_gpio::raw::RawGpioDriver;
use keylock_gpio::{GpioDriver, GpioError, GpioPin, GpioResult};
use keylock_gpio::GpioActiveLevel::Low;
use keylock_gpio::GpioBias::PullUp;
use keylock_gpio::GpioDriveMode::OpenDrain;
use crate::app::App;
use crate::config::{GpioBackend, Settings};
use crate::feedback::LedFeedback;
use crate::machine::PasscodeMachine;
use crate::store::JsonFileStore;

/// Turns an array of results into a result of an array.
fn all<T, const N: usize>(items: [GpioResult<T>; N]) -> GpioResult<[T; N]> {
    items
        .into_iter()
        .collect::<GpioResult<Vec<T>>>()?
        .try_into()
        .map_err(|_| GpioError::InvalidArgument)
}

fn claim<const N: usize>(gpio: &dyn GpioDriver, indices: [usize; N]) -> GpioResult<[Box<dyn GpioPin + '_>; N]> {
    all(indices.map(|index| gpio.get_pin(index)))
}

fn main() -> eyre::Result<()> {
    // Initialize environment and logger
    dotenv().ok();
    pretty_env_logger::init();

    const UNKNOWN_STR: &str = "???";

    info!("KeyLock v{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        "Running on {} {} (kernel {}), host {}, {}",
        System::name().as_deref().unwrap_or(UNKNOWN_STR),
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR),
        System::cpu_arch(),
    );

    let settings = Settings::from_env()?;

    info!("Keypad @ Rows: {:?}, Cols: {:?}", settings.keypad_rows, settings.keypad_cols);
    info!("LEDs @ Green: {}, Red: {}", settings.led_green, settings.led_red);

    debug!("Initializing GPIO driver ({:?})...", settings.backend);
    match settings.backend {
        GpioBackend::GpioMem => run(&RawGpioDriver::new_gpiomem()?, &settings),
        GpioBackend::Mem => run(&RawGpioDriver::new_mem()?, &settings),
        GpioBackend::Gpiod => run(&GpiodDriver::open(&settings.gpio_chip)?, &settings),
    }
}

fn run(gpio: &dyn GpioDriver, settings: &Settings) -> eyre::Result<()> {
    debug!("{:?} initialized.", gpio);

    debug!("Initializing LEDs...");
    let mut green_pin = gpio.get_pin(settings.led_green)?;
    let mut red_pin = gpio.get_pin(settings.led_red)?;
    let green = green_pin.as_output()?;
    let red = red_pin.as_output()?;
    let delay = ThreadDelay;
    let leds = LedFeedback::new(&*green, &*red, &delay);
    leds.rest()?;

    debug!("Initializing keypad driver...");
    let mut row_pins = claim(gpio, settings.keypad_rows)?;
    for pin in &mut row_pins {
        pin.set_bias(PullUp)?;
        pin.set_active_level(Low)?;
    }
    let mut col_pins = claim(gpio, settings.keypad_cols)?;
    for pin in &mut col_pins {
        pin.set_drive_mode(OpenDrain)?;
        pin.set_active_level(Low)?;
    }
    let rows = all(row_pins.each_mut().map(|pin| pin.as_input()))?;
    let cols = all(col_pins.each_mut().map(|pin| pin.as_output()))?;

    let mut keypad = GpioKeypad::new(
        cols.each_ref().map(|line| &**line),
        rows.each_ref().map(|line| &**line),
        &delay,
    )?;

    debug!("{:?} initialized.", keypad);

    debug!("Opening passcode store...");
    let store = JsonFileStore::open(&settings.store_file)?;
    debug!("Passcode store opened at {}.", store.path().display());
    let machine = PasscodeMachine::new(store, leds)?;

    info!("KeyLock initialized.");
    info!("Starting main loop...");

    let mut app = App::new(&mut keypad, machine);
    loop {
        app.update()?;

        if !settings.poll_interval.is_zero() {
            delay.delay(settings.poll_interval);
        }
    }
}
