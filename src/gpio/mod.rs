mod analog_in;
mod analog_out;

pub(crate) use analog_in::{read_pin, read_pin_async};
pub(crate) use analog_out::{queue_write, write_now};

pub use crate::microcontroller_src::peripherals::PinMode;
pub use {analog_in::*, analog_out::*};
