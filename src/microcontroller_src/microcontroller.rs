use std::{
    future::Future,
    time::{Duration, Instant},
};

use futures::{executor::block_on, future::join};

use crate::{
    boards::sim::{SimBoard, SimProbe},
    gpio::*,
    microcontroller_src::{
        board::{Board, BoardError, Hardware, SharableHardware},
        interrupt_driver::PendingOperations,
        peripherals::PeripheralError,
    },
    utils::{
        auxiliary::{SharableRef, SharableRefExt},
        notification::{Notification, Notifier},
    },
};

/// Enums the different errors possible when configuring the mode of a pin
#[derive(Debug, Clone, PartialEq)]
pub enum PinModeError {
    ErrorSettingMode(BoardError),
    InvalidPeripheral(PeripheralError),
}

/// Primary abstraction for interacting with the board, providing access to its pins and the
/// event loop that completes asynchronous operations.
///
/// - `hardware`: The board and the bookkeeping of its pins, shared with every driver handle
/// - `pending`: Operations (reads, queued writes) waiting for the next update
/// - `notification`: Signalled whenever an operation is queued, wakes the update loop
pub struct Microcontroller<'a> {
    hardware: SharableHardware<'a>,
    pending: PendingOperations<'a>,
    notification: Notification,
}

impl<'a> Microcontroller<'a> {
    /// Creates a new Microcontroller driving `board`
    pub fn with_board<B: Board + 'a>(board: B) -> Self {
        log::info!("Starting microcontroller on {}", board.name());
        let notification = Notification::new();
        Microcontroller {
            hardware: Hardware::new_sharable(board),
            pending: PendingOperations::new(notification.notifier()),
            notification,
        }
    }

    /// Creates a Microcontroller on a simulated BeagleBone Black header
    pub fn simulated() -> Self {
        Self::with_board(SimBoard::beaglebone_black())
    }

    /// Creates a Microcontroller on a simulated BeagleBone Black header, returning the probe
    /// that records and scripts the simulated hardware
    pub fn simulated_with_probe() -> (Self, SimProbe) {
        let board = SimBoard::beaglebone_black();
        let probe = board.probe();
        (Self::with_board(board), probe)
    }

    /// Creates a Microcontroller on the ESP32-C6 this program runs on.
    ///
    /// # Errors
    ///
    /// - `BoardError::Driver`: If the ADC driver cannot be started
    #[cfg(feature = "esp")]
    pub fn esp32c6() -> Result<Self, BoardError> {
        Ok(Self::with_board(crate::boards::esp::EspBoard::take()?))
    }

    pub fn board_name(&self) -> &'static str {
        self.hardware.deref().board.name()
    }

    /// Configures the direction and pull of a pin.
    ///
    /// # Arguments
    ///
    /// - `pin`: Name of the pin, for example "P9_14"
    /// - `mode`: The desired `PinMode`
    ///
    /// # Errors
    ///
    /// - `PinModeError::InvalidPeripheral`: If the pin does not exist or is input only and
    ///     `mode` is `PinMode::Output`
    /// - `PinModeError::ErrorSettingMode`: If the board fails to configure it
    pub fn pin_mode(&mut self, pin: &str, mode: PinMode) -> Result<(), PinModeError> {
        let mut hardware = self.hardware.deref_mut();
        let pin = hardware.peripherals.get_pin_for_mode(pin, mode)?;
        hardware
            .board
            .set_pin_mode(&pin, mode)
            .map_err(PinModeError::ErrorSettingMode)?;
        hardware.peripherals.set_mode(&pin, mode);
        log::debug!("{}: mode set to {:?}", pin.name, mode);
        Ok(())
    }

    /// Mode the framework last set on a pin, if any
    pub fn pin_mode_of(&self, pin: &str) -> Result<Option<PinMode>, PeripheralError> {
        let hardware = self.hardware.deref();
        let pin = hardware.peripherals.get_pin(pin)?;
        Ok(hardware.peripherals.mode_of(&pin))
    }

    /// Drives a PWM signal on a pin.
    ///
    /// # Arguments
    ///
    /// - `pin`: Name of the pin
    /// - `duty`: Ratio of the period the signal is high, from 0 to 1
    /// - `freq_hz`: Frequency of the signal, `DEFAULT_PWM_FREQ_HZ` if `None`
    ///
    /// # Errors
    ///
    /// - `AnalogOutError::InvalidDuty` / `AnalogOutError::InvalidFrequency`: On out of range values
    /// - `AnalogOutError::InvalidPeripheral`: If the pin does not exist or cannot output PWM
    /// - `AnalogOutError::PinNotOutput`: If the pin was configured as an input
    /// - `AnalogOutError::ErrorSettingOutput`: If the board fails to apply it
    pub fn analog_write(&mut self, pin: &str, duty: f32, freq_hz: Option<u32>) -> Result<(), AnalogOutError> {
        write_now(&self.hardware, pin, duty, freq_hz).map(|_| ())
    }

    /// Same as [Self::analog_write], but the write is applied on the next update and then
    /// `callback` is called with its result. Invalid arguments are reported right away.
    pub fn analog_write_with_callback<F: FnOnce(Result<(), AnalogOutError>) + 'a>(
        &mut self,
        pin: &str,
        duty: f32,
        freq_hz: Option<u32>,
        callback: F,
    ) -> Result<(), AnalogOutError> {
        queue_write(
            &self.hardware,
            &mut self.pending,
            pin,
            (duty, freq_hz.unwrap_or(DEFAULT_PWM_FREQ_HZ)),
            Box::new(callback),
        )
    }

    /// Last PWM output applied to a pin, if any
    pub fn pwm_settings_of(&self, pin: &str) -> Result<Option<PwmSettings>, PeripheralError> {
        let hardware = self.hardware.deref();
        let pin = hardware.peripherals.get_pin(pin)?;
        Ok(hardware.peripherals.pwm_output_of(&pin))
    }

    /// Reads an analog input. The pin is sampled on the next update and then `callback` is
    /// called with the reading.
    ///
    /// # Errors
    ///
    /// - `AnalogInError::InvalidPeripheral`: If the pin does not exist or has no analog input.
    ///     In this case nothing is queued and `callback` is never called.
    pub fn analog_read<F: FnOnce(Result<AnalogReading, AnalogInError>) + 'a>(
        &mut self,
        pin: &str,
        callback: F,
    ) -> Result<(), AnalogInError> {
        read_pin(&self.hardware, &mut self.pending, pin, Box::new(callback))
    }

    /// Reads an analog input, returning a future that resolves with the reading. See
    /// [Self::block_on] to wait for it.
    pub fn analog_read_async(
        &mut self,
        pin: &str,
    ) -> Result<impl Future<Output = Result<AnalogReading, AnalogInError>> + 'static, AnalogInError> {
        read_pin_async(&self.hardware, &mut self.pending, pin)
    }

    /// Sets pin as analog input
    pub fn set_pin_as_analog_in(&mut self, pin: &str) -> Result<AnalogIn<'a>, AnalogInError> {
        AnalogIn::new(pin, self.hardware.clone(), self.pending.clone())
    }

    /// Sets pin as analog output with the desired frequency
    pub fn set_pin_as_analog_out(&mut self, pin: &str, freq_hz: u32) -> Result<AnalogOut<'a>, AnalogOutError> {
        AnalogOut::new(pin, freq_hz, self.hardware.clone(), self.pending.clone())
    }

    /// Sets pin as analog output, with a default frequency of 2000 Hertz
    pub fn set_pin_as_default_analog_out(&mut self, pin: &str) -> Result<AnalogOut<'a>, AnalogOutError> {
        self.set_pin_as_analog_out(pin, DEFAULT_PWM_FREQ_HZ)
    }

    pub fn pending_operations(&self) -> usize {
        self.pending.len()
    }

    /// Completes every operation queued so far, in the order they were queued.
    ///
    /// # Returns
    ///
    /// The amount of operations completed
    pub fn update(&mut self) -> usize {
        let operations = self.pending.take_all();
        let completed = operations.len();
        for operation in operations {
            operation.update_interrupt(&self.hardware);
        }
        completed
    }

    /// Updates until no operation is pending, including the ones queued by callbacks.
    ///
    /// # Returns
    ///
    /// The amount of operations completed
    pub fn run_until_idle(&mut self) -> usize {
        let mut completed = 0;
        while self.pending_operations() > 0 {
            completed += self.update();
        }
        completed
    }

    fn wait_for_updates_indefinitly(&mut self) {
        loop {
            self.notification.blocking_wait();
            self.update();
        }
    }

    fn wait_for_updates_until(&mut self, miliseconds: u32) {
        let deadline = Instant::now() + Duration::from_millis(miliseconds as u64);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            if self.notification.blocking_wait_timeout(remaining) {
                self.update();
            }
        }
    }

    /// Completes operations as they are queued, during `miliseconds` or forever if `None`.
    pub fn wait_for_updates(&mut self, miliseconds: Option<u32>) {
        match miliseconds {
            Some(milis) => self.wait_for_updates_until(milis),
            None => self.wait_for_updates_indefinitly(),
        }
    }

    pub fn sleep(&mut self, miliseconds: u32) {
        self.hardware.deref_mut().board.delay_ms(miliseconds)
    }

    async fn wait_for_updates_until_finished(&mut self, finished: SharableRef<bool>) {
        while !*finished.deref() {
            self.notification.wait().await;
            self.update();
        }
    }

    /// Runs `fut` to completion while updating the microcontroller, so that futures returned
    /// by the async reads resolve.
    pub fn block_on<F: Future>(&mut self, fut: F) -> F::Output {
        let finished = SharableRef::new_sharable(false);
        let fut = wrap_user_future(self.notification.notifier(), finished.clone(), fut);
        let (output, _) = block_on(join(fut, self.wait_for_updates_until_finished(finished)));
        output
    }
}

impl<'a> Default for Microcontroller<'a> {
    fn default() -> Self {
        Self::simulated()
    }
}

async fn wrap_user_future<F: Future>(notifier: Notifier, mut finished: SharableRef<bool>, fut: F) -> F::Output {
    let res = fut.await;
    *finished.deref_mut() = true;
    notifier.notify();
    res
}

impl From<PeripheralError> for PinModeError {
    fn from(value: PeripheralError) -> Self {
        PinModeError::InvalidPeripheral(value)
    }
}
