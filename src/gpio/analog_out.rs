use crate::microcontroller_src::{
    board::{BoardError, Hardware, SharableHardware},
    interrupt_driver::{InterruptDriver, PendingOperations},
    peripherals::{PeripheralError, Peripherals, PinInfo},
};

/// Frequency used when a write does not specify one
pub const DEFAULT_PWM_FREQ_HZ: u32 = 2000;

/// Highest PWM frequency accepted by the framework
pub const MAX_PWM_FREQ_HZ: u32 = 40_000_000;

/// Enums the different errors possible when working with the analog out
#[derive(Debug, Clone, PartialEq)]
pub enum AnalogOutError {
    ErrorSettingOutput(BoardError),
    InvalidDuty(f32),
    InvalidFrequency(u32),
    InvalidPeripheral(PeripheralError),
    PinNotOutput(String),
}

/// Output applied to a PWM pin
/// - `duty`: Ratio of the period the signal is high, from 0 to 1
/// - `freq_hz`: Frequency of the signal in hertz
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PwmSettings {
    pub duty: f32,
    pub freq_hz: u32,
}

impl PwmSettings {
    /// Creates validated settings.
    ///
    /// # Errors
    ///
    /// - `AnalogOutError::InvalidDuty`: If `duty` is not a number in [0, 1]
    /// - `AnalogOutError::InvalidFrequency`: If `freq_hz` is 0 or above `MAX_PWM_FREQ_HZ`
    pub fn new(duty: f32, freq_hz: u32) -> Result<PwmSettings, AnalogOutError> {
        Ok(PwmSettings {
            duty: validate_duty(duty)?,
            freq_hz: validate_frequency(freq_hz)?,
        })
    }

    /// Duty as a percentage, the way the output is usually reported
    pub fn duty_percent(&self) -> f32 {
        self.duty * 100.0
    }

    /// Time the signal stays high on each period, in microseconds
    pub fn pulse_width_us(&self) -> f32 {
        self.duty * 1_000_000.0 / self.freq_hz as f32
    }
}

/// Checks the duty is in the closed range [0, 1]. Values outside it are rejected, never clamped.
pub fn validate_duty(duty: f32) -> Result<f32, AnalogOutError> {
    if (0.0..=1.0).contains(&duty) {
        Ok(duty)
    } else {
        Err(AnalogOutError::InvalidDuty(duty))
    }
}

pub fn validate_frequency(freq_hz: u32) -> Result<u32, AnalogOutError> {
    if freq_hz == 0 || freq_hz > MAX_PWM_FREQ_HZ {
        return Err(AnalogOutError::InvalidFrequency(freq_hz));
    }
    Ok(freq_hz)
}

/// Resolves a pin that can output a PWM signal and was not configured as an input
pub(crate) fn resolve_pwm_pin(peripherals: &Peripherals, pin: &str) -> Result<PinInfo, AnalogOutError> {
    let pin = peripherals.get_pwm_pin(pin)?;
    check_output_pin(peripherals, &pin)?;
    Ok(pin)
}

fn check_output_pin(peripherals: &Peripherals, pin: &PinInfo) -> Result<(), AnalogOutError> {
    match peripherals.mode_of(pin) {
        Some(mode) if mode.is_input() => Err(AnalogOutError::PinNotOutput(pin.name.to_string())),
        _ => Ok(()),
    }
}

/// Sends the settings to the board and remembers them as the current output of the pin
fn apply_write(hardware: &mut Hardware, pin: &PinInfo, settings: PwmSettings) -> Result<(), AnalogOutError> {
    check_output_pin(&hardware.peripherals, pin)?;
    hardware
        .board
        .write_pwm(pin, settings)
        .map_err(AnalogOutError::ErrorSettingOutput)?;
    hardware.peripherals.set_pwm_output(pin, settings);
    log::debug!(
        "{}: pwm duty {:.2}% at {} Hz",
        pin.name,
        settings.duty_percent(),
        settings.freq_hz
    );
    Ok(())
}

/// Validates and applies a write right away
pub(crate) fn write_now(
    hardware: &SharableHardware,
    pin: &str,
    duty: f32,
    freq_hz: Option<u32>,
) -> Result<PwmSettings, AnalogOutError> {
    let mut hardware = hardware.borrow_mut();
    let pin = resolve_pwm_pin(&hardware.peripherals, pin)?;
    let settings = PwmSettings::new(duty, freq_hz.unwrap_or(DEFAULT_PWM_FREQ_HZ))?;
    apply_write(&mut hardware, &pin, settings)?;
    Ok(settings)
}

pub(crate) type WriteCallback<'a> = Box<dyn FnOnce(Result<(), AnalogOutError>) + 'a>;

/// A write waiting for the next update of the microcontroller
pub(crate) struct PendingWrite<'a> {
    pin: PinInfo,
    settings: PwmSettings,
    callback: WriteCallback<'a>,
}

impl<'a> InterruptDriver<'a> for PendingWrite<'a> {
    fn update_interrupt(self: Box<Self>, hardware: &SharableHardware<'a>) {
        let result = apply_write(&mut hardware.borrow_mut(), &self.pin, self.settings);
        if let Err(err) = &result {
            log::warn!("{}: queued pwm write failed: {:?}", self.pin.name, err);
        }
        (self.callback)(result)
    }
}

/// Validates a write and queues it. Invalid arguments are reported right away and nothing
/// is queued.
pub(crate) fn queue_write<'a>(
    hardware: &SharableHardware<'a>,
    pending: &mut PendingOperations<'a>,
    pin: &str,
    settings: (f32, u32),
    callback: WriteCallback<'a>,
) -> Result<(), AnalogOutError> {
    let pin = resolve_pwm_pin(&hardware.borrow().peripherals, pin)?;
    let settings = PwmSettings::new(settings.0, settings.1)?;
    pending.push(Box::new(PendingWrite {
        pin,
        settings,
        callback,
    }));
    Ok(())
}

/// Driver to handle an analog output (PWM) for a particular pin.
/// - `pin`: The pin driven by this handle
/// - `freq_hz`: Frequency used by writes that do not specify one
/// - `hardware`: Board shared with the microcontroller
/// - `pending`: Queue of the microcontroller, used by the callback based writes
pub struct AnalogOut<'a> {
    pin: PinInfo,
    freq_hz: u32,
    hardware: SharableHardware<'a>,
    pending: PendingOperations<'a>,
}

impl<'a> AnalogOut<'a> {
    /// Creates a new AnalogOut for a pin. Nothing is written to the board until a duty is set.
    ///
    /// # Errors
    ///
    /// - `AnalogOutError::InvalidPeripheral`: If the pin does not exist or cannot output PWM
    /// - `AnalogOutError::PinNotOutput`: If the pin was configured as an input
    /// - `AnalogOutError::InvalidFrequency`: If the frequency is out of range
    pub(crate) fn new(
        pin: &str,
        freq_hz: u32,
        hardware: SharableHardware<'a>,
        pending: PendingOperations<'a>,
    ) -> Result<AnalogOut<'a>, AnalogOutError> {
        let pin = resolve_pwm_pin(&hardware.borrow().peripherals, pin)?;
        Ok(AnalogOut {
            pin,
            freq_hz: validate_frequency(freq_hz)?,
            hardware,
            pending,
        })
    }

    pub fn pin_name(&self) -> &'static str {
        self.pin.name
    }

    pub fn frequency(&self) -> u32 {
        self.freq_hz
    }

    /// Changes the output signal to be at it maximun
    pub fn set_high(&mut self) -> Result<(), AnalogOutError> {
        self.set_high_level_output_ratio(1.0)
    }

    /// Changes the output signal to be at it minimum
    pub fn set_low(&mut self) -> Result<(), AnalogOutError> {
        self.set_high_level_output_ratio(0.0)
    }

    /// Changes the intensity of the signal using the High-Low level ratio, keeping the
    /// frequency of the handle.
    ///
    /// # Errors
    ///
    /// - `AnalogOutError::InvalidDuty`: If `high_ratio` is not in [0, 1]
    /// - `AnalogOutError::ErrorSettingOutput`: If the board fails to apply it
    pub fn set_high_level_output_ratio(&mut self, high_ratio: f32) -> Result<(), AnalogOutError> {
        self.write(high_ratio, None)
    }

    /// Changes the frequency of the handle. If the pin is already outputting a signal it is
    /// rewritten with the same duty and the new frequency.
    pub fn set_frequency(&mut self, freq_hz: u32) -> Result<(), AnalogOutError> {
        self.freq_hz = validate_frequency(freq_hz)?;
        match self.settings() {
            Some(current) => self.write(current.duty, None),
            None => Ok(()),
        }
    }

    /// Writes a duty, optionally changing the frequency of the handle.
    pub fn write(&mut self, duty: f32, freq_hz: Option<u32>) -> Result<(), AnalogOutError> {
        let settings = PwmSettings::new(duty, freq_hz.unwrap_or(self.freq_hz))?;
        apply_write(&mut self.hardware.borrow_mut(), &self.pin, settings)?;
        self.freq_hz = settings.freq_hz;
        Ok(())
    }

    /// Queues a write that is applied on the next update of the microcontroller, then calls
    /// `callback` with its result.
    pub fn write_with_callback<F: FnOnce(Result<(), AnalogOutError>) + 'a>(
        &mut self,
        duty: f32,
        freq_hz: Option<u32>,
        callback: F,
    ) -> Result<(), AnalogOutError> {
        let freq_hz = freq_hz.unwrap_or(self.freq_hz);
        queue_write(
            &self.hardware,
            &mut self.pending,
            self.pin.name,
            (duty, freq_hz),
            Box::new(callback),
        )?;
        self.freq_hz = freq_hz;
        Ok(())
    }

    /// Last output applied to the pin, by this or any other handle
    pub fn settings(&self) -> Option<PwmSettings> {
        self.hardware.borrow().peripherals.pwm_output_of(&self.pin)
    }
}

impl From<PeripheralError> for AnalogOutError {
    fn from(value: PeripheralError) -> Self {
        AnalogOutError::InvalidPeripheral(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        boards::sim::{SimEvent, SimProbe},
        gpio::PinMode,
        utils::auxiliary::{SharableRef, SharableRefExt},
        Microcontroller,
    };

    fn initialize_test<'a>(pin: &str) -> (Microcontroller<'a>, AnalogOut<'a>, SimProbe) {
        let (mut micro, probe) = Microcontroller::simulated_with_probe();
        let out = micro.set_pin_as_default_analog_out(pin).unwrap();
        (micro, out, probe)
    }

    #[test]
    fn test0_validate_duty_rejects_out_of_range_values() {
        assert_eq!(validate_duty(0.0), Ok(0.0));
        assert_eq!(validate_duty(1.0), Ok(1.0));
        assert_eq!(validate_duty(1.5), Err(AnalogOutError::InvalidDuty(1.5)));
        assert_eq!(validate_duty(-0.1), Err(AnalogOutError::InvalidDuty(-0.1)));
        assert!(validate_duty(f32::NAN).is_err());
    }

    #[test]
    fn test1_validate_frequency_bounds() {
        assert_eq!(validate_frequency(0), Err(AnalogOutError::InvalidFrequency(0)));
        assert_eq!(validate_frequency(DEFAULT_PWM_FREQ_HZ), Ok(2000));
        assert!(validate_frequency(MAX_PWM_FREQ_HZ + 1).is_err());
    }

    #[test]
    fn test2_pulse_width_of_a_40khz_signal() {
        let settings = PwmSettings::new(0.4, 40_000).unwrap();
        assert!((settings.pulse_width_us() - 10.0).abs() < 1e-4);
        assert!((settings.duty_percent() - 40.0).abs() < 1e-4);
    }

    #[test]
    fn test3_handle_keeps_its_frequency() {
        let (_micro, mut out, probe) = initialize_test("P9_14");
        out.set_frequency(40_000).unwrap();
        assert!(probe.pwm_writes().is_empty());
        out.set_high_level_output_ratio(0.25).unwrap();
        out.set_high().unwrap();
        assert_eq!(
            probe.pwm_writes(),
            vec![
                ("P9_14".to_string(), PwmSettings { duty: 0.25, freq_hz: 40_000 }),
                ("P9_14".to_string(), PwmSettings { duty: 1.0, freq_hz: 40_000 }),
            ]
        );
        assert_eq!(out.settings(), Some(PwmSettings { duty: 1.0, freq_hz: 40_000 }));
    }

    #[test]
    fn test4_set_frequency_rewrites_the_current_duty() {
        let (_micro, mut out, probe) = initialize_test("P9_14");
        out.set_high_level_output_ratio(0.5).unwrap();
        out.set_frequency(1000).unwrap();
        assert_eq!(probe.pwm_writes().len(), 2);
        assert_eq!(out.settings(), Some(PwmSettings { duty: 0.5, freq_hz: 1000 }));
    }

    #[test]
    fn test5_invalid_duty_does_not_reach_the_board() {
        let (_micro, mut out, probe) = initialize_test("P9_14");
        assert_eq!(out.set_high_level_output_ratio(1.5), Err(AnalogOutError::InvalidDuty(1.5)));
        assert!(probe.pwm_writes().is_empty());
        assert_eq!(out.settings(), None);
    }

    #[test]
    fn test6_write_with_callback_runs_on_update() {
        let (mut micro, mut out, probe) = initialize_test("P9_14");
        let result = SharableRef::new_sharable(None);
        let result_ref = result.clone();
        out.write_with_callback(0.3, None, move |res| *result_ref.borrow_mut() = Some(res))
            .unwrap();
        assert!(probe.pwm_writes().is_empty());
        assert!(result.borrow().is_none());
        micro.update();
        assert_eq!(*result.borrow(), Some(Ok(())));
        assert_eq!(probe.pwm_writes().len(), 1);
    }

    #[test]
    fn test7_input_pin_cannot_be_driven() {
        let (mut micro, probe) = Microcontroller::simulated_with_probe();
        micro.pin_mode("P9_16", PinMode::Input).unwrap();
        assert_eq!(
            micro.set_pin_as_default_analog_out("P9_16").err(),
            Some(AnalogOutError::PinNotOutput("P9_16".to_string()))
        );
        assert_eq!(
            micro.set_pin_as_default_analog_out("P9_36").err(),
            Some(AnalogOutError::InvalidPeripheral(PeripheralError::NotAPwmPin(
                "P9_36".to_string()
            )))
        );
        assert!(!probe.events().iter().any(|e| matches!(e, SimEvent::PwmWrite { .. })));
    }
}
