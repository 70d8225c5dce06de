use std::future::Future;

use futures::channel::oneshot;

use crate::microcontroller_src::{
    board::{BoardError, Hardware, SharableHardware},
    interrupt_driver::{InterruptDriver, PendingOperations},
    peripherals::{PeripheralError, PinInfo},
};

/// Highest value of a 12 bit ADC
pub const ADC_MAX_DIGITAL_VAL: u16 = 4095;

/// Maximum input voltage of the BeagleBone analog inputs
pub const BEAGLEBONE_AIN_REFERENCE_VOLTS: f32 = 1.8;

/// Enums the different errors possible when working with the analog in
#[derive(Debug, Clone, PartialEq)]
pub enum AnalogInError {
    Cancelled,
    ErrorReading(BoardError),
    InvalidPeripheral(PeripheralError),
    InvalidSampleCount,
}

/// Result of sampling an analog input
/// - `value`: Voltage normalized to the reference of the board, 0 is 0V and 1 is the maximum
///     input voltage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalogReading {
    pub value: f32,
}

impl AnalogReading {
    /// Creates a reading from a raw ADC value. Values above `max_raw` are saturated.
    pub fn from_raw(raw: u16, max_raw: u16) -> AnalogReading {
        if max_raw == 0 {
            return AnalogReading { value: 0.0 };
        }
        AnalogReading {
            value: raw.min(max_raw) as f32 / max_raw as f32,
        }
    }

    /// Voltage on the pin given the reference voltage of the board
    pub fn volts(&self, reference_volts: f32) -> f32 {
        self.value * reference_volts
    }
}

pub(crate) type ReadCallback<'a> = Box<dyn FnOnce(Result<AnalogReading, AnalogInError>) + 'a>;

/// Samples the pin on the board. Boards should already return values in [0, 1], anything
/// outside is saturated and a NaN is reported as a failed read.
fn sample(hardware: &mut Hardware, pin: &PinInfo) -> Result<AnalogReading, AnalogInError> {
    let value = hardware
        .board
        .read_analog(pin)
        .map_err(AnalogInError::ErrorReading)?;
    if value.is_nan() {
        return Err(AnalogInError::ErrorReading(BoardError::Fault(format!(
            "{} returned NaN",
            pin.name
        ))));
    }
    log::debug!("{}: analog read {}", pin.name, value);
    Ok(AnalogReading {
        value: value.clamp(0.0, 1.0),
    })
}

/// A read waiting for the next update of the microcontroller
pub(crate) struct PendingRead<'a> {
    pin: PinInfo,
    callback: ReadCallback<'a>,
}

impl<'a> InterruptDriver<'a> for PendingRead<'a> {
    fn update_interrupt(self: Box<Self>, hardware: &SharableHardware<'a>) {
        let result = sample(&mut hardware.borrow_mut(), &self.pin);
        (self.callback)(result)
    }
}

pub(crate) fn resolve_analog_pin(hardware: &SharableHardware, pin: &str) -> Result<PinInfo, AnalogInError> {
    Ok(hardware.borrow().peripherals.get_analog_pin(pin)?)
}

fn queue_read<'a>(pending: &mut PendingOperations<'a>, pin: PinInfo, callback: ReadCallback<'a>) {
    pending.push(Box::new(PendingRead { pin, callback }));
}

/// Queues a read whose result is delivered through the returned future
fn queue_read_async<'a>(
    pending: &mut PendingOperations<'a>,
    pin: PinInfo,
) -> impl Future<Output = Result<AnalogReading, AnalogInError>> + 'static {
    let (sender, receiver) = oneshot::channel();
    queue_read(
        pending,
        pin,
        Box::new(move |result| {
            // The receiver may have been dropped, nobody is waiting for the value then
            let _ = sender.send(result);
        }),
    );
    async move { receiver.await.unwrap_or(Err(AnalogInError::Cancelled)) }
}

/// Driver for receiving analog inputs from a particular pin
/// - `pin`: The analog input sampled by this handle
/// - `hardware`: Board shared with the microcontroller
/// - `pending`: Queue of the microcontroller where reads wait to be completed
pub struct AnalogIn<'a> {
    pin: PinInfo,
    hardware: SharableHardware<'a>,
    pending: PendingOperations<'a>,
}

impl<'a> AnalogIn<'a> {
    /// Create a new AnalogIn for a specific pin.
    ///
    /// # Errors
    ///
    /// - `AnalogInError::InvalidPeripheral`: If the pin does not exist or has no analog input
    pub(crate) fn new(
        pin: &str,
        hardware: SharableHardware<'a>,
        pending: PendingOperations<'a>,
    ) -> Result<AnalogIn<'a>, AnalogInError> {
        Ok(AnalogIn {
            pin: resolve_analog_pin(&hardware, pin)?,
            hardware,
            pending,
        })
    }

    pub fn pin_name(&self) -> &'static str {
        self.pin.name
    }

    /// Queues a read. The pin is sampled on the next update of the microcontroller and then
    /// `callback` is called with the reading.
    pub fn read<F: FnOnce(Result<AnalogReading, AnalogInError>) + 'a>(&mut self, callback: F) {
        queue_read(&mut self.pending, self.pin.clone(), Box::new(callback))
    }

    /// Queues a read and returns a future that resolves once the microcontroller completes it.
    /// The future must be driven with `Microcontroller::block_on` (or while something else
    /// keeps updating the microcontroller), otherwise it never resolves.
    pub fn read_async(&mut self) -> impl Future<Output = Result<AnalogReading, AnalogInError>> + 'static {
        queue_read_async(&mut self.pending, self.pin.clone())
    }

    /// Samples the pin right away, without going through the update loop.
    ///
    /// # Errors
    ///
    /// - `AnalogInError::ErrorReading`: If the board fails to sample the pin
    pub fn read_now(&mut self) -> Result<AnalogReading, AnalogInError> {
        sample(&mut self.hardware.borrow_mut(), &self.pin)
    }

    /// Reads multiple times from the analog pin and returns the average value.
    /// It is used to get a more stable value from the analog pin.
    ///
    /// # Errors
    ///
    /// - `AnalogInError::InvalidSampleCount` : If `amount_of_samples` is 0
    /// - `AnalogInError::ErrorReading` : If any of the reads fails
    pub fn smooth_read(&mut self, amount_of_samples: u16) -> Result<AnalogReading, AnalogInError> {
        if amount_of_samples == 0 {
            return Err(AnalogInError::InvalidSampleCount);
        }
        let mut total = 0.0;
        for _ in 0..amount_of_samples {
            total += self.read_now()?.value;
        }
        Ok(AnalogReading {
            value: total / amount_of_samples as f32,
        })
    }
}

/// Queues a read on the pending operations of the microcontroller
pub(crate) fn read_pin<'a>(
    hardware: &SharableHardware<'a>,
    pending: &mut PendingOperations<'a>,
    pin: &str,
    callback: ReadCallback<'a>,
) -> Result<(), AnalogInError> {
    let pin = resolve_analog_pin(hardware, pin)?;
    queue_read(pending, pin, callback);
    Ok(())
}

pub(crate) fn read_pin_async<'a>(
    hardware: &SharableHardware<'a>,
    pending: &mut PendingOperations<'a>,
    pin: &str,
) -> Result<impl Future<Output = Result<AnalogReading, AnalogInError>> + 'static, AnalogInError> {
    let pin = resolve_analog_pin(hardware, pin)?;
    Ok(queue_read_async(pending, pin))
}

impl From<PeripheralError> for AnalogInError {
    fn from(value: PeripheralError) -> Self {
        AnalogInError::InvalidPeripheral(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        boards::sim::SimEvent,
        utils::auxiliary::{SharableRef, SharableRefExt},
        Microcontroller,
    };

    #[test]
    fn test0_reading_from_raw_saturates() {
        assert_eq!(AnalogReading::from_raw(0, ADC_MAX_DIGITAL_VAL).value, 0.0);
        assert_eq!(AnalogReading::from_raw(4095, ADC_MAX_DIGITAL_VAL).value, 1.0);
        assert_eq!(AnalogReading::from_raw(5000, ADC_MAX_DIGITAL_VAL).value, 1.0);
        assert_eq!(AnalogReading::from_raw(7, 0).value, 0.0);
        let half = AnalogReading { value: 0.5 };
        assert!((half.volts(BEAGLEBONE_AIN_REFERENCE_VOLTS) - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test1_read_is_completed_on_update() {
        let (mut micro, probe) = Microcontroller::simulated_with_probe();
        probe.set_analog_level("P9_36", 0.42).unwrap();
        let mut input = micro.set_pin_as_analog_in("P9_36").unwrap();
        let reading = SharableRef::new_sharable(None);
        let mut reading_ref = reading.clone();
        input.read(move |res| *reading_ref.deref_mut() = Some(res));

        assert!(reading.deref().is_none());
        assert_eq!(probe.analog_reads(), 0);
        micro.update();
        assert_eq!(*reading.deref(), Some(Ok(AnalogReading { value: 0.42 })));
        assert_eq!(probe.analog_reads(), 1);
    }

    #[test]
    fn test2_read_now_and_smooth_read() {
        let (mut micro, probe) = Microcontroller::simulated_with_probe();
        probe.set_analog_level("P9_39", 0.25).unwrap();
        let mut input = micro.set_pin_as_analog_in("p9_39").unwrap();
        assert_eq!(input.pin_name(), "P9_39");
        assert_eq!(input.read_now(), Ok(AnalogReading { value: 0.25 }));
        assert_eq!(input.smooth_read(4), Ok(AnalogReading { value: 0.25 }));
        assert_eq!(input.smooth_read(0), Err(AnalogInError::InvalidSampleCount));
        assert_eq!(probe.analog_reads(), 5);
    }

    #[test]
    fn test3_board_failure_reaches_the_caller() {
        let (mut micro, probe) = Microcontroller::simulated_with_probe();
        probe.fail_reads_on("P9_36").unwrap();
        let mut input = micro.set_pin_as_analog_in("P9_36").unwrap();
        assert!(matches!(input.read_now(), Err(AnalogInError::ErrorReading(_))));
    }

    #[test]
    fn test4_read_async_resolves_inside_block_on() {
        let (mut micro, probe) = Microcontroller::simulated_with_probe();
        probe.set_analog_level("P9_40", 0.75).unwrap();
        let mut input = micro.set_pin_as_analog_in("P9_40").unwrap();
        let reading = micro.block_on(async move { input.read_async().await });
        assert_eq!(reading, Ok(AnalogReading { value: 0.75 }));
        assert_eq!(
            probe.events(),
            vec![SimEvent::AnalogRead {
                pin: "P9_40".to_string()
            }]
        );
    }

    #[test]
    fn test5_pin_without_analog_input_is_rejected() {
        let (mut micro, _probe) = Microcontroller::simulated_with_probe();
        assert_eq!(
            micro.set_pin_as_analog_in("P9_14").err(),
            Some(AnalogInError::InvalidPeripheral(PeripheralError::NotAnAnalogPin(
                "P9_14".to_string()
            )))
        );
    }

    #[test]
    fn test6_only_raw_counts_span_the_whole_range() {
        // A full scale pin samples 4095 counts but about 3300 calibrated millivolts
        assert_eq!(AnalogReading::from_raw(ADC_MAX_DIGITAL_VAL, ADC_MAX_DIGITAL_VAL).value, 1.0);
        assert!(AnalogReading::from_raw(3300, ADC_MAX_DIGITAL_VAL).value < 0.81);
        assert!((AnalogReading::from_raw(2048, ADC_MAX_DIGITAL_VAL).value - 0.5).abs() < 1e-3);
    }
}
