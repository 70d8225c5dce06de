use crate::{
    gpio::PinMode,
    mppt::{encode_reading, Calibration, MpptStep, PerturbObserve, SensorReadings, DEFAULT_MAX_DUTY, FRAME_LEN},
    utils::boneio_error::BoneIoError,
    Microcontroller,
};

/// PWM frequency of the boost converter, a 25us period
pub const MPPT_PWM_FREQ_HZ: u32 = 40_000;

/// Names of the values sent every cycle, in the order they are encoded
pub const READING_NAMES: [&str; 5] = ["OutVoltage", "InCurrent", "InVoltage", "OutCurrent", "Efficiency"];

/// Wiring of the converter to the board
#[derive(Debug, Clone, PartialEq)]
pub struct MpptConfig {
    pub pwm_pin: &'static str,
    pub pwm_freq_hz: u32,
    pub hall_in_pin: &'static str,
    pub hall_out_pin: &'static str,
    pub v_in_pin: &'static str,
    pub v_out_pin: &'static str,
    pub calibration: Calibration,
    pub max_duty: f32,
}

impl Default for MpptConfig {
    fn default() -> Self {
        MpptConfig {
            pwm_pin: "P9_14",
            pwm_freq_hz: MPPT_PWM_FREQ_HZ,
            hall_in_pin: "P9_39",
            hall_out_pin: "P9_40",
            v_in_pin: "P9_37",
            v_out_pin: "P9_38",
            calibration: Calibration::default(),
            max_duty: DEFAULT_MAX_DUTY,
        }
    }
}

/// What happened in one cycle of the tracker
/// - `frames`: The encoded readings, in the order of `READING_NAMES`. A value that cannot be
///     encoded is sent as a frame of NULs.
#[derive(Debug, Clone, PartialEq)]
pub struct MpptReport {
    pub readings: SensorReadings,
    pub step: MpptStep,
    pub efficiency: f32,
    pub frames: [[u8; FRAME_LEN]; 5],
}

/// Runs `iterations` cycles of the Perturb & Observe tracker. Every cycle reads the four
/// sensors of the converter, steps the tracker and drives the PWM pin with the new duty.
///
/// # Errors
///
/// - `BoneIoError::PinModeError` / `BoneIoError::AnalogOutError`: If the PWM pin cannot be used
/// - `BoneIoError::AnalogInError`: If any sensor pin has no analog input or a read fails.
///     Cycles stop at the first failed read.
pub fn perturb_and_observe(
    micro: &mut Microcontroller,
    config: &MpptConfig,
    iterations: usize,
) -> Result<Vec<MpptReport>, BoneIoError> {
    micro.pin_mode(config.pwm_pin, PinMode::Output)?;
    let mut pwm = micro.set_pin_as_analog_out(config.pwm_pin, config.pwm_freq_hz)?;
    let mut hall_in = micro.set_pin_as_analog_in(config.hall_in_pin)?;
    let mut hall_out = micro.set_pin_as_analog_in(config.hall_out_pin)?;
    let mut v_in = micro.set_pin_as_analog_in(config.v_in_pin)?;
    let mut v_out = micro.set_pin_as_analog_in(config.v_out_pin)?;
    let mut tracker = PerturbObserve::with_max_duty(config.max_duty);
    let calibration = config.calibration;

    micro.block_on(async move {
        let mut reports = Vec::with_capacity(iterations);
        for cycle in 0..iterations {
            let hall_in_reading = hall_in.read_async();
            let hall_out_reading = hall_out.read_async();
            let v_in_reading = v_in.read_async();
            let v_out_reading = v_out.read_async();

            let readings = SensorReadings::from_fractions(
                &calibration,
                hall_in_reading.await?.value,
                hall_out_reading.await?.value,
                v_in_reading.await?.value,
                v_out_reading.await?.value,
            );
            let step = tracker.step(&readings);
            pwm.set_high_level_output_ratio(step.duty)?;

            let efficiency = readings.efficiency();
            log::info!(
                "cycle {}: in {:.2}V {:.2}A, out {:.2}V {:.2}A, pwm {:.2}%, efficiency {:.2}%",
                cycle,
                readings.in_voltage,
                readings.in_current,
                readings.out_voltage,
                readings.out_current,
                step.duty * 100.0,
                efficiency
            );

            let values = [
                readings.out_voltage,
                readings.in_current,
                readings.in_voltage,
                readings.out_current,
                efficiency,
            ];
            let mut frames = [[0u8; FRAME_LEN]; 5];
            for ((frame, value), name) in frames.iter_mut().zip(values).zip(READING_NAMES) {
                match encode_reading(value) {
                    Ok(encoded) => *frame = encoded,
                    Err(err) => log::warn!("{} not sent: {:?}", name, err),
                }
            }

            reports.push(MpptReport {
                readings,
                step,
                efficiency,
                frames,
            });
        }
        Ok::<_, BoneIoError>(reports)
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        boards::sim::SimProbe,
        gpio::AnalogInError,
        mppt::{decode_reading, AIN_MULT, HALL_IN_NO_CURRENT, HALL_OUT_NO_CURRENT, I_IN_DIV, I_OUT_DIV, V_IN_MULT, V_OUT_MULT},
    };

    fn close(a: f32, b: f32, tolerance: f32) -> bool {
        (a - b).abs() < tolerance
    }

    /// 60V and 1A going in, 120V and 0.5A going out
    fn script_converter(probe: &SimProbe) {
        probe.set_analog_level("P9_39", (HALL_IN_NO_CURRENT + I_IN_DIV) / AIN_MULT).unwrap();
        probe.set_analog_level("P9_40", (HALL_OUT_NO_CURRENT + 0.5 * I_OUT_DIV) / AIN_MULT).unwrap();
        probe.set_analog_level("P9_37", 60.0 / (AIN_MULT * V_IN_MULT)).unwrap();
        probe.set_analog_level("P9_38", 120.0 / (AIN_MULT * V_OUT_MULT)).unwrap();
    }

    #[test]
    fn test0_cycles_read_step_and_write() {
        let (mut micro, probe) = Microcontroller::simulated_with_probe();
        script_converter(&probe);

        let reports = perturb_and_observe(&mut micro, &MpptConfig::default(), 2).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(probe.analog_reads(), 8);
        let writes = probe.pwm_writes();
        assert_eq!(writes.len(), 2);
        for (pin, settings) in writes {
            assert_eq!(pin, "P9_14");
            assert_eq!(settings.freq_hz, MPPT_PWM_FREQ_HZ);
            assert!(settings.duty <= DEFAULT_MAX_DUTY);
        }
        let first = &reports[0];
        assert!(close(first.readings.in_voltage, 60.0, 1e-2));
        assert!(close(first.readings.out_current, 0.5, 1e-2));
        assert!(close(first.step.duty, 0.5, 1e-2));
        assert!(close(first.efficiency, 100.0, 0.5));
        assert_eq!(micro.pending_operations(), 0);
    }

    #[test]
    fn test1_frames_carry_the_readings() {
        let (mut micro, probe) = Microcontroller::simulated_with_probe();
        script_converter(&probe);

        let reports = perturb_and_observe(&mut micro, &MpptConfig::default(), 1).unwrap();

        let report = &reports[0];
        let expected = [
            report.readings.out_voltage,
            report.readings.in_current,
            report.readings.in_voltage,
            report.readings.out_current,
            report.efficiency,
        ];
        for (frame, value) in report.frames.iter().zip(expected) {
            assert!(close(decode_reading(frame).unwrap(), value, 1e-3));
        }
    }

    #[test]
    fn test2_negative_values_are_sent_as_empty_frames() {
        let (mut micro, probe) = Microcontroller::simulated_with_probe();
        script_converter(&probe);
        // No voltage on the hall sensors reads as a negative current
        probe.set_analog_level("P9_39", 0.0).unwrap();
        probe.set_analog_level("P9_40", 0.0).unwrap();

        let reports = perturb_and_observe(&mut micro, &MpptConfig::default(), 1).unwrap();

        let report = &reports[0];
        assert!(report.readings.in_current < 0.0);
        assert_eq!(report.frames[1], [0u8; FRAME_LEN]);
        assert_eq!(report.frames[3], [0u8; FRAME_LEN]);
        assert_ne!(report.frames[0], [0u8; FRAME_LEN]);
    }

    #[test]
    fn test3_failed_read_stops_the_tracker() {
        let (mut micro, probe) = Microcontroller::simulated_with_probe();
        script_converter(&probe);
        probe.fail_reads_on("P9_38").unwrap();

        let res = perturb_and_observe(&mut micro, &MpptConfig::default(), 3);

        assert!(matches!(
            res,
            Err(BoneIoError::AnalogInError(AnalogInError::ErrorReading(_)))
        ));
        assert!(probe.pwm_writes().is_empty());
    }

    #[test]
    fn test4_sensor_on_a_pwm_pin_is_rejected() {
        let (mut micro, probe) = Microcontroller::simulated_with_probe();
        let config = MpptConfig {
            v_out_pin: "P9_16",
            ..Default::default()
        };
        let res = perturb_and_observe(&mut micro, &config, 1);
        assert!(matches!(res, Err(BoneIoError::AnalogInError(AnalogInError::InvalidPeripheral(_)))));
        assert_eq!(probe.analog_reads(), 0);
    }
}
