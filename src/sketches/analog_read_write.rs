use std::io::Write;

use crate::{
    gpio::{AnalogInError, AnalogReading, PinMode},
    utils::{
        auxiliary::{SharableRef, SharableRefExt},
        boneio_error::BoneIoError,
    },
    Microcontroller,
};

/// Pins and output of the sketch. The defaults drive P9_14 at 70% with the default PWM
/// frequency and read P9_36.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalogReadWriteConfig {
    pub out_pin: &'static str,
    pub in_pin: &'static str,
    pub duty: f32,
    pub freq_hz: Option<u32>,
}

impl Default for AnalogReadWriteConfig {
    fn default() -> Self {
        AnalogReadWriteConfig {
            out_pin: "P9_14",
            in_pin: "P9_36",
            duty: 0.7,
            freq_hz: None,
        }
    }
}

/// Sets the output pin as output, drives a PWM signal on it and reads the input pin. Once
/// the read completes `x.value = <value>` is printed on `console`.
///
/// # Errors
///
/// - `BoneIoError::PinModeError`: If the output pin cannot be set as output
/// - `BoneIoError::AnalogOutError`: If the PWM output is rejected by the framework or the board
/// - `BoneIoError::AnalogInError`: If the input pin has no analog input
pub fn analog_read_write<'a, W: Write + 'a>(
    micro: &mut Microcontroller<'a>,
    config: &AnalogReadWriteConfig,
    mut console: SharableRef<W>,
) -> Result<(), BoneIoError> {
    micro.pin_mode(config.out_pin, PinMode::Output)?;
    micro.analog_write(config.out_pin, config.duty, config.freq_hz)?;
    micro.analog_read(config.in_pin, move |x| print_status(&mut console, x))?;
    micro.run_until_idle();
    Ok(())
}

fn print_status<W: Write>(console: &mut SharableRef<W>, x: Result<AnalogReading, AnalogInError>) {
    match x {
        Ok(x) => {
            if let Err(err) = writeln!(console.deref_mut(), "x.value = {}", x.value) {
                log::error!("Could not print the reading: {}", err);
            }
        }
        Err(err) => log::error!("Analog read failed: {:?}", err),
    }
}
