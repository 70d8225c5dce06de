/// Voltage on an analog pin when the reading is at its maximum
pub const AIN_MULT: f32 = 3.3;
/// Divider ratio of the input voltage sense
pub const V_IN_MULT: f32 = 50.989761;
/// Divider ratio of the output voltage sense
pub const V_OUT_MULT: f32 = 51.011235;
/// Volts per ampere of the input hall sensor
pub const I_IN_DIV: f32 = 0.09776;
/// Volts per ampere of the output hall sensor
pub const I_OUT_DIV: f32 = 0.09605;
/// Voltage of the input hall sensor with no current flowing
pub const HALL_IN_NO_CURRENT: f32 = 2.524;
/// Voltage of the output hall sensor with no current flowing
pub const HALL_OUT_NO_CURRENT: f32 = 2.514;
/// The boost converter must never be driven above this duty
pub const DEFAULT_MAX_DUTY: f32 = 0.8;
/// Operating point the tracker starts from, 60V at 1A
pub const INITIAL_VOLTAGE: f32 = 60.0;
pub const INITIAL_CURRENT: f32 = 1.0;

/// Conversion from the analog readings of the converter to volts and amperes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub ain_mult: f32,
    pub v_in_mult: f32,
    pub v_out_mult: f32,
    pub i_in_div: f32,
    pub i_out_div: f32,
    pub hall_in_no_current: f32,
    pub hall_out_no_current: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration {
            ain_mult: AIN_MULT,
            v_in_mult: V_IN_MULT,
            v_out_mult: V_OUT_MULT,
            i_in_div: I_IN_DIV,
            i_out_div: I_OUT_DIV,
            hall_in_no_current: HALL_IN_NO_CURRENT,
            hall_out_no_current: HALL_OUT_NO_CURRENT,
        }
    }
}

/// Voltages and currents on both sides of the converter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReadings {
    pub in_voltage: f32,
    pub in_current: f32,
    pub out_voltage: f32,
    pub out_current: f32,
}

impl SensorReadings {
    /// Builds the readings from the normalized values of the four analog inputs.
    ///
    /// # Arguments
    ///
    /// - `cal`: Calibration of the sensing circuit
    /// - `hall_in`, `hall_out`: Readings of the input and output hall sensors
    /// - `v_in`, `v_out`: Readings of the input and output voltage dividers
    pub fn from_fractions(cal: &Calibration, hall_in: f32, hall_out: f32, v_in: f32, v_out: f32) -> Self {
        let hall_in_volts = hall_in * cal.ain_mult;
        let hall_out_volts = hall_out * cal.ain_mult;
        SensorReadings {
            in_voltage: v_in * cal.ain_mult * cal.v_in_mult,
            in_current: (hall_in_volts - cal.hall_in_no_current) / cal.i_in_div,
            out_voltage: v_out * cal.ain_mult * cal.v_out_mult,
            out_current: (hall_out_volts - cal.hall_out_no_current) / cal.i_out_div,
        }
    }

    pub fn in_power(&self) -> f32 {
        self.in_voltage * self.in_current
    }

    pub fn out_power(&self) -> f32 {
        self.out_voltage * self.out_current
    }

    /// Output over input power, as a percentage. 0 if no power goes in.
    pub fn efficiency(&self) -> f32 {
        let in_power = self.in_power();
        if in_power == 0.0 {
            return 0.0;
        }
        self.out_power() / in_power * 100.0
    }
}

/// Point of the p-v curve the tracker compares the next readings against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatingPoint {
    pub voltage: f32,
    pub current: f32,
    pub power: f32,
}

/// Outcome of a single step of the tracker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MpptStep {
    pub delta_voltage: f32,
    pub delta_power: f32,
    pub target_voltage: f32,
    pub duty: f32,
}

/// Perturb & Observe maximum power point tracker.
///
/// Every step compares the input power against the previous operating point. If the power
/// grew the input voltage target keeps climbing by the last perturbation, if it dropped the
/// target goes back down. The duty of the boost converter follows from the target and the
/// output voltage.
#[derive(Debug, Clone, PartialEq)]
pub struct PerturbObserve {
    reference: OperatingPoint,
    max_duty: f32,
}

impl PerturbObserve {
    pub fn new() -> Self {
        Self::with_max_duty(DEFAULT_MAX_DUTY)
    }

    /// Creates a tracker whose duty never exceeds `max_duty`, saturated to [0, 1]
    pub fn with_max_duty(max_duty: f32) -> Self {
        PerturbObserve {
            reference: OperatingPoint {
                voltage: INITIAL_VOLTAGE,
                current: INITIAL_CURRENT,
                power: INITIAL_VOLTAGE * INITIAL_CURRENT,
            },
            max_duty: max_duty.clamp(0.0, 1.0),
        }
    }

    pub fn reference(&self) -> OperatingPoint {
        self.reference
    }

    pub fn max_duty(&self) -> f32 {
        self.max_duty
    }

    /// Perturbs the operating point with new readings.
    ///
    /// # Returns
    ///
    /// The `MpptStep` with the new voltage target and the duty to drive the converter with
    pub fn step(&mut self, readings: &SensorReadings) -> MpptStep {
        let in_power = readings.in_power();
        let delta_voltage = readings.in_voltage - self.reference.voltage;
        let delta_power = in_power - self.reference.power;

        let target_voltage = if delta_power > 0.0 {
            readings.in_voltage + delta_voltage.abs()
        } else if delta_power < 0.0 {
            readings.in_voltage - delta_voltage.abs()
        } else {
            readings.in_voltage
        };

        self.reference = OperatingPoint {
            voltage: target_voltage,
            current: readings.in_current,
            power: in_power,
        };

        MpptStep {
            delta_voltage,
            delta_power,
            target_voltage,
            duty: duty_for(readings.out_voltage, target_voltage, self.max_duty),
        }
    }
}

impl Default for PerturbObserve {
    fn default() -> Self {
        Self::new()
    }
}

/// Duty of a boost converter taking `target_voltage` to `out_voltage`, in [0, `max_duty`].
/// 0 when there is no output voltage.
pub fn duty_for(out_voltage: f32, target_voltage: f32, max_duty: f32) -> f32 {
    if out_voltage <= 0.0 || out_voltage.is_nan() {
        return 0.0;
    }
    let duty = (out_voltage - target_voltage) / out_voltage;
    if duty.is_nan() {
        return 0.0;
    }
    duty.clamp(0.0, max_duty)
}
