use std::{collections::HashMap, rc::Rc};

use esp_idf_svc::{
    hal::{
        delay::FreeRtos,
        gpio::AnyIOPin,
        ledc::{config::TimerConfig, *},
        peripheral,
        prelude::*,
    },
    sys::{self, EspError},
};

use crate::{
    boards::pin_tables,
    gpio::{AnalogReading, PinMode, PwmSettings, ADC_MAX_DIGITAL_VAL},
    microcontroller_src::{
        board::{Board, BoardError},
        peripherals::{PinInfo, PinTable},
    },
};

use self::adc::{AnalogChannels, SharableAdcDriver};

/// Amount of LEDC channel/timer pairs handed out to PWM pins
const PWM_COUNT: usize = 4;

/// ESP32-C6 board, driving PWM pins through the LEDC and analog inputs through the oneshot ADC1.
/// LEDC channel N is always paired with timer N, so every PWM pin can have its own frequency.
pub struct EspBoard {
    table: PinTable,
    adc_driver: SharableAdcDriver,
    analog_channels: HashMap<u8, AnalogChannels>,
    pwm_outputs: HashMap<u8, PwmOutput>,
    free_pwm_slots: Vec<usize>,
}

/// A pin currently driven by the LEDC
struct PwmOutput {
    driver: LedcDriver<'static>,
    slot: usize,
    freq_hz: u32,
}

impl EspBoard {
    /// Takes the ESP32-C6 peripherals used by the framework.
    ///
    /// # Errors
    ///
    /// - `BoardError::Driver`: If the ADC driver cannot be started
    pub fn take() -> Result<Self, BoardError> {
        sys::link_patches();
        Ok(EspBoard {
            table: pin_tables::esp32c6(),
            adc_driver: adc::start_adc_driver()?,
            analog_channels: HashMap::new(),
            pwm_outputs: HashMap::new(),
            free_pwm_slots: (0..PWM_COUNT).rev().collect(),
        })
    }

    /// Replaces the pin table, usually to add aliases so that sketches written for another
    /// header run unchanged, for example `pin_tables::esp32c6().with_alias("P9_14", "GPIO5")`.
    pub fn with_table(mut self, table: PinTable) -> Self {
        self.table = table;
        self
    }

    /// Creates a LedcDriver on `slot` for the given pin and frequency, 10 bits of resolution
    fn create_pwm_driver(slot: usize, gpio: u8, freq_hz: u32) -> Result<LedcDriver<'static>, EspError> {
        let config = TimerConfig::new()
            .frequency(freq_hz.Hz())
            .resolution(Resolution::Bits10);
        let pin = unsafe { AnyIOPin::new(gpio as i32) };
        match slot {
            0 => Self::create_pwm_driver_on_timer(slot, unsafe { TIMER0::new() }, pin, &config),
            1 => Self::create_pwm_driver_on_timer(slot, unsafe { TIMER1::new() }, pin, &config),
            2 => Self::create_pwm_driver_on_timer(slot, unsafe { TIMER2::new() }, pin, &config),
            _ => Self::create_pwm_driver_on_timer(slot, unsafe { TIMER3::new() }, pin, &config),
        }
    }

    fn create_pwm_driver_on_timer<L: LedcTimer<SpeedMode = LowSpeed> + 'static>(
        slot: usize,
        timer: impl peripheral::Peripheral<P = L> + 'static,
        pin: AnyIOPin,
        config: &TimerConfig,
    ) -> Result<LedcDriver<'static>, EspError> {
        let timer_driver = LedcTimerDriver::new(timer, config)?;
        match slot {
            0 => LedcDriver::new(unsafe { CHANNEL0::new() }, timer_driver, pin),
            1 => LedcDriver::new(unsafe { CHANNEL1::new() }, timer_driver, pin),
            2 => LedcDriver::new(unsafe { CHANNEL2::new() }, timer_driver, pin),
            _ => LedcDriver::new(unsafe { CHANNEL3::new() }, timer_driver, pin),
        }
    }

    /// Returns the LEDC output of the pin, creating it (or re-creating it when the frequency
    /// changed) as needed
    fn pwm_output(&mut self, gpio: u8, freq_hz: u32) -> Result<&mut PwmOutput, BoardError> {
        let slot = match self.pwm_outputs.get(&gpio) {
            Some(output) if output.freq_hz == freq_hz => None,
            Some(output) => Some(output.slot),
            None => Some(
                self.free_pwm_slots
                    .pop()
                    .ok_or_else(|| BoardError::Fault("no free LEDC channel".to_string()))?,
            ),
        };

        if let Some(slot) = slot {
            // The previous driver must be dropped before its channel and timer are taken again
            self.pwm_outputs.remove(&gpio);
            match Self::create_pwm_driver(slot, gpio, freq_hz) {
                Ok(driver) => {
                    self.pwm_outputs.insert(gpio, PwmOutput { driver, slot, freq_hz });
                }
                Err(err) => {
                    self.free_pwm_slots.push(slot);
                    return Err(err.into());
                }
            }
        }

        self.pwm_outputs
            .get_mut(&gpio)
            .ok_or_else(|| BoardError::Fault(format!("GPIO{gpio} has no LEDC output")))
    }
}

impl Board for EspBoard {
    fn name(&self) -> &'static str {
        "ESP32-C6"
    }

    fn pin_table(&self) -> PinTable {
        self.table.clone()
    }

    fn set_pin_mode(&mut self, pin: &PinInfo, mode: PinMode) -> Result<(), BoardError> {
        let gpio = pin.gpio.ok_or(BoardError::Unsupported)? as i32;
        let (direction, pull) = match mode {
            PinMode::Output => (sys::gpio_mode_t_GPIO_MODE_OUTPUT, sys::gpio_pull_mode_t_GPIO_FLOATING),
            PinMode::Input => (sys::gpio_mode_t_GPIO_MODE_INPUT, sys::gpio_pull_mode_t_GPIO_FLOATING),
            PinMode::InputPullup => (sys::gpio_mode_t_GPIO_MODE_INPUT, sys::gpio_pull_mode_t_GPIO_PULLUP_ONLY),
            PinMode::InputPulldown => (sys::gpio_mode_t_GPIO_MODE_INPUT, sys::gpio_pull_mode_t_GPIO_PULLDOWN_ONLY),
        };
        sys::esp!(unsafe { sys::gpio_set_direction(gpio, direction) })?;
        sys::esp!(unsafe { sys::gpio_set_pull_mode(gpio, pull) })?;
        Ok(())
    }

    fn write_pwm(&mut self, pin: &PinInfo, settings: PwmSettings) -> Result<(), BoardError> {
        let gpio = pin.gpio.ok_or(BoardError::Unsupported)?;
        let output = self.pwm_output(gpio, settings.freq_hz)?;
        let duty = duty_from_high_ratio(output.driver.get_max_duty(), settings.duty);
        output.driver.set_duty(duty)?;
        Ok(())
    }

    fn read_analog(&mut self, pin: &PinInfo) -> Result<f32, BoardError> {
        let ain = pin.ain.ok_or(BoardError::Unsupported)?;
        if !self.analog_channels.contains_key(&ain) {
            let channel = adc::new_channel(ain, self.adc_driver.clone())?;
            self.analog_channels.insert(ain, channel);
        }
        let channel = self
            .analog_channels
            .get_mut(&ain)
            .ok_or(BoardError::Unsupported)?;
        let raw = channel.read_raw()?;
        Ok(AnalogReading::from_raw(raw, ADC_MAX_DIGITAL_VAL).value)
    }

    fn delay_ms(&mut self, miliseconds: u32) {
        FreeRtos::delay_ms(miliseconds)
    }
}

/// Calculates the duty using the intensity of the signal
///
/// # Arguments
/// - `max_duty` : Maximum duty of the driver instance, that depends of the resolution.
/// - `high_ratio` : Intensity of the signal, from 0 to 1. Is the percentage of time the signal is high.
fn duty_from_high_ratio(max_duty: u32, high_ratio: f32) -> u32 {
    ((max_duty as f32) * high_ratio) as u32
}

impl From<EspError> for BoardError {
    fn from(value: EspError) -> Self {
        BoardError::Driver(value.code())
    }
}

mod adc {
    use super::{BoardError, EspError, Rc, ADC_MAX_DIGITAL_VAL};
    use esp_idf_svc::hal::{adc::*, gpio::*};
    use oneshot::{config::AdcChannelConfig, AdcChannelDriver, AdcDriver};

    pub type SharableAdcDriver = Rc<AdcDriver<'static, ADC1>>;

    /// Enums the possible channels from the ADC. In the ESP32-C6 the
    /// ADC has 7 channels, each on a different GPIO going from
    /// GPIO-0 to GPIO-6 inclusive
    pub enum AnalogChannels {
        Channel0(AdcChannelDriver<'static, Gpio0, SharableAdcDriver>),
        Channel1(AdcChannelDriver<'static, Gpio1, SharableAdcDriver>),
        Channel2(AdcChannelDriver<'static, Gpio2, SharableAdcDriver>),
        Channel3(AdcChannelDriver<'static, Gpio3, SharableAdcDriver>),
        Channel4(AdcChannelDriver<'static, Gpio4, SharableAdcDriver>),
        Channel5(AdcChannelDriver<'static, Gpio5, SharableAdcDriver>),
        Channel6(AdcChannelDriver<'static, Gpio6, SharableAdcDriver>),
    }

    impl AnalogChannels {
        /// Raw 12 bit sample, range [0, `ADC_MAX_DIGITAL_VAL`]. `read` would return calibrated
        /// millivolts instead, which do not span the whole range.
        pub fn read_raw(&mut self) -> Result<u16, EspError> {
            let value = match self {
                AnalogChannels::Channel0(channel_driver) => channel_driver.read_raw(),
                AnalogChannels::Channel1(channel_driver) => channel_driver.read_raw(),
                AnalogChannels::Channel2(channel_driver) => channel_driver.read_raw(),
                AnalogChannels::Channel3(channel_driver) => channel_driver.read_raw(),
                AnalogChannels::Channel4(channel_driver) => channel_driver.read_raw(),
                AnalogChannels::Channel5(channel_driver) => channel_driver.read_raw(),
                AnalogChannels::Channel6(channel_driver) => channel_driver.read_raw(),
            }?;
            Ok(value.min(ADC_MAX_DIGITAL_VAL))
        }
    }

    pub fn start_adc_driver() -> Result<SharableAdcDriver, BoardError> {
        Ok(Rc::new(AdcDriver::new(unsafe { ADC1::new() })?))
    }

    /// Creates the channel driver of an analog input, 11dB of attenuation so the whole
    /// range of the pin maps to the 12 bits of the sample
    pub fn new_channel(ain: u8, adc_driver: SharableAdcDriver) -> Result<AnalogChannels, BoardError> {
        let mut config = AdcChannelConfig::new();
        config.attenuation = attenuation::DB_11;
        config.resolution = Resolution::Resolution12Bit;
        config.calibration = true;
        let channel = match ain {
            0 => AnalogChannels::Channel0(AdcChannelDriver::new(adc_driver, unsafe { Gpio0::new() }, &config)?),
            1 => AnalogChannels::Channel1(AdcChannelDriver::new(adc_driver, unsafe { Gpio1::new() }, &config)?),
            2 => AnalogChannels::Channel2(AdcChannelDriver::new(adc_driver, unsafe { Gpio2::new() }, &config)?),
            3 => AnalogChannels::Channel3(AdcChannelDriver::new(adc_driver, unsafe { Gpio3::new() }, &config)?),
            4 => AnalogChannels::Channel4(AdcChannelDriver::new(adc_driver, unsafe { Gpio4::new() }, &config)?),
            5 => AnalogChannels::Channel5(AdcChannelDriver::new(adc_driver, unsafe { Gpio5::new() }, &config)?),
            6 => AnalogChannels::Channel6(AdcChannelDriver::new(adc_driver, unsafe { Gpio6::new() }, &config)?),
            _ => return Err(BoardError::Unsupported),
        };
        Ok(channel)
    }
}
