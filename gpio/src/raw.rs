//! Direct register access to the BCM GPIO block through `/dev/gpiomem` or `/dev/mem`.

use crate::{GpioActiveLevel, GpioBias, GpioDriveMode, GpioDriver, GpioError, GpioInput, GpioOutput, GpioPin, GpioResult};
use bitvec::vec::BitVec;
use log::trace;
use memmap2::{MmapOptions, MmapRaw};
use std::fmt::{Debug, Formatter};
use std::fs::OpenOptions;
use std::sync::atomic::AtomicU8;

/// Word offsets of the registers used, relative to the GPIO base.
mod reg {
    /// GPFSELn, 3 bits per line, 10 lines per register.
    pub const FSEL: usize = 0x00 / 4;
    /// GPSETn, 1 bit per line.
    pub const SET: usize = 0x1c / 4;
    /// GPCLRn, 1 bit per line.
    pub const CLR: usize = 0x28 / 4;
    /// GPLEVn, 1 bit per line.
    pub const LEV: usize = 0x34 / 4;
    /// GPIO_PUP_PDN_CNTRL_REGn, 2 bits per line, 16 lines per register.
    pub const PULL: usize = 0xe4 / 4;
}

const FUNCTION_INPUT: u32 = 0b000;
const FUNCTION_OUTPUT: u32 = 0b001;

pub struct RawGpioDriver {
    mmap: MmapRaw,
    used_pins: BitVec<AtomicU8>,
}

impl RawGpioDriver {
    const GPIO_BASE: u64 = 0x3F20_0000;
    const PIN_COUNT: usize = 58;

    fn create(path: &str, offset: u64) -> GpioResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;

        let mmap = MmapOptions::new()
            .offset(offset)
            .len(4096)
            .map_raw(&file)?;

        Ok(RawGpioDriver {
            mmap,
            used_pins: BitVec::repeat(false, Self::PIN_COUNT),
        })
    }

    /// Maps the GPIO block through `/dev/gpiomem`, which does not need root.
    pub fn new_gpiomem() -> GpioResult<Self> {
        Self::create("/dev/gpiomem", 0)
    }

    /// Maps the GPIO block through `/dev/mem`.
    pub fn new_mem() -> GpioResult<Self> {
        Self::create("/dev/mem", Self::GPIO_BASE)
    }

    fn check(pin: usize) -> GpioResult<()> {
        if pin >= Self::PIN_COUNT {
            Err(GpioError::InvalidArgument)
        } else {
            Ok(())
        }
    }

    fn read_word(&self, word: usize) -> u32 {
        let base = self.mmap.as_ptr() as *const u32;
        // SAFETY: every caller stays inside the 4 KiB mapping (word < 0x400).
        unsafe { base.add(word).read_volatile() }
    }

    fn write_word(&self, word: usize, value: u32) {
        let base = self.mmap.as_mut_ptr() as *mut u32;
        // SAFETY: as in read_word.
        unsafe { base.add(word).write_volatile(value) }
    }

    /// Read-modify-write of a `width`-bit field belonging to `pin`.
    fn write_field(&self, first_word: usize, width: usize, pin: usize, value: u32) {
        let per_word = 32 / width;
        let word = first_word + pin / per_word;
        let shift = (pin % per_word) * width;
        let mask = ((1 << width) - 1) << shift;
        let current = self.read_word(word);
        self.write_word(word, (current & !mask) | ((value << shift) & mask));
    }

    fn set_function(&self, pin: usize, function: u32) -> GpioResult<()> {
        Self::check(pin)?;
        self.write_field(reg::FSEL, 3, pin, function);
        trace!("GPIO{} function {:03b}", pin, function);
        Ok(())
    }

    fn set_level(&self, pin: usize, high: bool) -> GpioResult<()> {
        Self::check(pin)?;
        let first = if high { reg::SET } else { reg::CLR };
        self.write_word(first + pin / 32, 1 << (pin % 32));
        Ok(())
    }

    fn level(&self, pin: usize) -> GpioResult<bool> {
        Self::check(pin)?;
        Ok(self.read_word(reg::LEV + pin / 32) >> (pin % 32) & 1 == 1)
    }

    fn set_pull(&self, pin: usize, bias: GpioBias) -> GpioResult<()> {
        Self::check(pin)?;
        let value = match bias {
            GpioBias::None => 0b00,
            GpioBias::PullUp => 0b01,
            GpioBias::PullDown => 0b10,
        };
        self.write_field(reg::PULL, 2, pin, value);
        Ok(())
    }

    /// Drives an output line, emulating open-drain/open-source by switching it to input.
    fn drive(&self, pin: usize, high: bool, mode: GpioDriveMode) -> GpioResult<()> {
        match mode.get_state(high) {
            Some(level) => {
                self.set_level(pin, level)?;
                self.set_function(pin, FUNCTION_OUTPUT)
            }
            None => self.set_function(pin, FUNCTION_INPUT),
        }
    }

    fn reset(&self, pin: usize) -> GpioResult<()> {
        self.set_function(pin, FUNCTION_INPUT)?;
        self.set_pull(pin, GpioBias::None)
    }
}

impl Debug for RawGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawGpioDriver({:#x})", self.mmap.as_ptr().addr())
    }
}

impl GpioDriver for RawGpioDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(Self::PIN_COUNT)
    }

    fn get_pin(&self, index: usize) -> GpioResult<Box<dyn GpioPin + '_>> {
        Self::check(index)?;

        if self.used_pins[index] {
            return Err(GpioError::AlreadyInUse);
        }

        self.used_pins.set_aliased(index, true);
        self.reset(index)?;

        Ok(Box::new(RawGpioPin {
            driver: self,
            index,
            active_level: GpioActiveLevel::High,
            drive_mode: GpioDriveMode::PushPull,
        }))
    }
}

struct RawGpioPin<'a> {
    driver: &'a RawGpioDriver,
    index: usize,
    active_level: GpioActiveLevel,
    drive_mode: GpioDriveMode,
}

impl Debug for RawGpioPin<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GPIO{}", self.index)
    }
}

impl GpioPin for RawGpioPin<'_> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioInput + '_>> {
        self.driver.set_function(self.index, FUNCTION_INPUT)?;
        Ok(Box::new(RawGpioLine { pin: self }))
    }

    fn as_output(&mut self) -> GpioResult<Box<dyn GpioOutput + '_>> {
        self.driver.set_function(self.index, FUNCTION_OUTPUT)?;
        Ok(Box::new(RawGpioLine { pin: self }))
    }

    fn set_active_level(&mut self, level: GpioActiveLevel) -> GpioResult<()> {
        self.active_level = level;
        Ok(())
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        self.driver.set_pull(self.index, bias)
    }

    fn set_drive_mode(&mut self, mode: GpioDriveMode) -> GpioResult<()> {
        self.drive_mode = mode;
        Ok(())
    }
}

impl Drop for RawGpioPin<'_> {
    fn drop(&mut self) {
        _ = self.driver.reset(self.index);
        self.driver.used_pins.set_aliased(self.index, false);
    }
}

/// A configured line; the direction was fixed by whichever `as_*` produced it.
struct RawGpioLine<'a> {
    pin: &'a RawGpioPin<'a>,
}

impl Debug for RawGpioLine<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.pin)
    }
}

impl GpioInput for RawGpioLine<'_> {
    fn read(&self) -> GpioResult<bool> {
        let level = self.pin.driver.level(self.pin.index)?;
        Ok(self.pin.active_level.get_state(level))
    }
}

impl GpioOutput for RawGpioLine<'_> {
    fn write(&self, value: bool) -> GpioResult<()> {
        let level = self.pin.active_level.get_state(value);
        self.pin.driver.drive(self.pin.index, level, self.pin.drive_mode)
    }
}
