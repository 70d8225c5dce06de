use std::{thread, time::Duration};

use crate::{
    gpio::PwmSettings,
    microcontroller_src::peripherals::{Peripherals, PinInfo, PinMode, PinTable},
    utils::auxiliary::{SharableRef, SharableRefExt},
};

/// Enums the different errors a board can report while talking to the hardware
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    Unsupported,
    Driver(i32),
    Fault(String),
}

/// Hardware backend of the framework. A board knows its pins and how to mux them, drive
/// a PWM output and sample an analog input. Everything else (validation, bookkeeping,
/// callbacks) is done by the framework before reaching the board.
pub trait Board {
    /// Human readable name, used in logs
    fn name(&self) -> &'static str;

    /// Pins exposed by this board
    fn pin_table(&self) -> PinTable;

    /// Configures the direction and pull of a pin
    fn set_pin_mode(&mut self, pin: &PinInfo, mode: PinMode) -> Result<(), BoardError>;

    /// Starts (or updates) a PWM output. `settings` are already validated.
    fn write_pwm(&mut self, pin: &PinInfo, settings: PwmSettings) -> Result<(), BoardError>;

    /// Samples an analog input, returning the voltage normalized to the reference of the
    /// board, so that 0 is 0V and 1 is the maximum input voltage.
    fn read_analog(&mut self, pin: &PinInfo) -> Result<f32, BoardError>;

    fn delay_ms(&mut self, miliseconds: u32) {
        thread::sleep(Duration::from_millis(miliseconds as u64))
    }
}

/// A board together with the framework bookkeeping of its pins
pub struct Hardware<'a> {
    pub board: Box<dyn Board + 'a>,
    pub peripherals: Peripherals,
}

pub type SharableHardware<'a> = SharableRef<Hardware<'a>>;

impl<'a> Hardware<'a> {
    pub fn new_sharable<B: Board + 'a>(board: B) -> SharableHardware<'a> {
        let peripherals = Peripherals::new(board.pin_table());
        SharableRef::new_sharable(Hardware {
            board: Box::new(board),
            peripherals,
        })
    }
}
