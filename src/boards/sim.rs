use std::collections::{HashMap, HashSet};

use crate::{
    boards::pin_tables,
    gpio::{PinMode, PwmSettings},
    microcontroller_src::{
        board::{Board, BoardError},
        peripherals::{PeripheralError, PinInfo, PinTable},
    },
    utils::auxiliary::{SharableRef, SharableRefExt},
};

/// Every call that reached the simulated hardware, in order
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    PinMode { pin: String, mode: PinMode },
    PwmWrite { pin: String, settings: PwmSettings },
    AnalogRead { pin: String },
}

#[derive(Default)]
struct SimState {
    events: Vec<SimEvent>,
    analog_levels: HashMap<String, f32>,
    failing_reads: HashSet<String>,
}

/// Board that records what the framework asks of it instead of touching any hardware.
/// Analog inputs return the level scripted through its `SimProbe`, or 0 if none was set.
pub struct SimBoard {
    table: PinTable,
    state: SharableRef<SimState>,
}

/// Handle to inspect and script a `SimBoard` after it was handed to a `Microcontroller`.
/// Pins are always identified by their canonical name, as listed in the pin table.
#[derive(Clone)]
pub struct SimProbe {
    table: PinTable,
    state: SharableRef<SimState>,
}

impl SimBoard {
    pub fn with_table(table: PinTable) -> Self {
        SimBoard {
            table,
            state: SharableRef::new_sharable(SimState::default()),
        }
    }

    pub fn beaglebone_black() -> Self {
        Self::with_table(pin_tables::beaglebone_black())
    }

    pub fn probe(&self) -> SimProbe {
        SimProbe {
            table: self.table.clone(),
            state: self.state.clone(),
        }
    }

    fn record(&mut self, event: SimEvent) {
        log::debug!("sim: {:?}", event);
        self.state.deref_mut().events.push(event);
    }
}

impl Board for SimBoard {
    fn name(&self) -> &'static str {
        "simulated board"
    }

    fn pin_table(&self) -> PinTable {
        self.table.clone()
    }

    fn set_pin_mode(&mut self, pin: &PinInfo, mode: PinMode) -> Result<(), BoardError> {
        self.record(SimEvent::PinMode {
            pin: pin.name.to_string(),
            mode,
        });
        Ok(())
    }

    fn write_pwm(&mut self, pin: &PinInfo, settings: PwmSettings) -> Result<(), BoardError> {
        self.record(SimEvent::PwmWrite {
            pin: pin.name.to_string(),
            settings,
        });
        Ok(())
    }

    fn read_analog(&mut self, pin: &PinInfo) -> Result<f32, BoardError> {
        self.record(SimEvent::AnalogRead {
            pin: pin.name.to_string(),
        });
        let state = self.state.deref();
        if state.failing_reads.contains(pin.name) {
            return Err(BoardError::Fault(format!("{} read failed", pin.name)));
        }
        let level = state.analog_levels.get(pin.name).copied().unwrap_or(0.0);
        Ok(level.clamp(0.0, 1.0))
    }

    fn delay_ms(&mut self, _miliseconds: u32) {}
}

impl SimProbe {
    /// Sets the normalized level the analog input will read. The simulated ADC saturates, so
    /// levels outside [0, 1] are read as the closest bound.
    ///
    /// # Errors
    ///
    /// - `PeripheralError::UnknownPin`: If the board has no pin or alias with that name
    pub fn set_analog_level(&self, pin: &str, level: f32) -> Result<(), PeripheralError> {
        let pin = self.canonical_name(pin)?;
        self.state.borrow_mut().analog_levels.insert(pin, level);
        Ok(())
    }

    /// Makes every following read of `pin` fail
    ///
    /// # Errors
    ///
    /// - `PeripheralError::UnknownPin`: If the board has no pin or alias with that name
    pub fn fail_reads_on(&self, pin: &str) -> Result<(), PeripheralError> {
        let pin = self.canonical_name(pin)?;
        self.state.borrow_mut().failing_reads.insert(pin);
        Ok(())
    }

    /// Resolves a pin the same way the framework does, so scripts follow case and aliases
    fn canonical_name(&self, pin: &str) -> Result<String, PeripheralError> {
        Ok(self.table.find(pin)?.name.to_string())
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.state.deref().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear()
    }

    pub fn pin_modes(&self) -> Vec<(String, PinMode)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SimEvent::PinMode { pin, mode } => Some((pin, mode)),
                _ => None,
            })
            .collect()
    }

    pub fn pwm_writes(&self) -> Vec<(String, PwmSettings)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SimEvent::PwmWrite { pin, settings } => Some((pin, settings)),
                _ => None,
            })
            .collect()
    }

    pub fn analog_reads(&self) -> usize {
        self.state
            .deref()
            .events
            .iter()
            .filter(|event| matches!(event, SimEvent::AnalogRead { .. }))
            .count()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test0_records_calls_in_order() {
        let mut board = SimBoard::beaglebone_black();
        let probe = board.probe();
        let table = board.pin_table();
        let out = table.find("P9_14").unwrap().clone();
        let ain = table.find("P9_36").unwrap().clone();

        board.set_pin_mode(&out, PinMode::Output).unwrap();
        board
            .write_pwm(&out, PwmSettings { duty: 0.7, freq_hz: 2000 })
            .unwrap();
        board.read_analog(&ain).unwrap();

        assert_eq!(
            probe.events(),
            vec![
                SimEvent::PinMode { pin: "P9_14".to_string(), mode: PinMode::Output },
                SimEvent::PwmWrite {
                    pin: "P9_14".to_string(),
                    settings: PwmSettings { duty: 0.7, freq_hz: 2000 }
                },
                SimEvent::AnalogRead { pin: "P9_36".to_string() },
            ]
        );
        probe.clear_events();
        assert!(probe.events().is_empty());
    }

    #[test]
    fn test1_scripted_levels_saturate() {
        let mut board = SimBoard::beaglebone_black();
        let probe = board.probe();
        let ain = board.pin_table().find("P9_39").unwrap().clone();

        assert_eq!(board.read_analog(&ain), Ok(0.0));
        probe.set_analog_level("P9_39", 1.7).unwrap();
        assert_eq!(board.read_analog(&ain), Ok(1.0));
        probe.fail_reads_on("P9_39").unwrap();
        assert!(board.read_analog(&ain).is_err());
        assert_eq!(probe.analog_reads(), 3);
    }

    #[test]
    fn test2_scripts_follow_case_and_aliases() {
        let mut board = SimBoard::with_table(pin_tables::beaglebone_black().with_alias("SENSE", "P9_36"));
        let probe = board.probe();
        let ain = board.pin_table().find("P9_36").unwrap().clone();

        probe.set_analog_level("p9_36", 0.42).unwrap();
        assert_eq!(board.read_analog(&ain), Ok(0.42));
        probe.set_analog_level("sense", 0.1).unwrap();
        assert_eq!(board.read_analog(&ain), Ok(0.1));
        assert_eq!(
            probe.set_analog_level("P9_99", 0.5),
            Err(PeripheralError::UnknownPin("P9_99".to_string()))
        );
        assert!(probe.fail_reads_on("p9_3").is_err());
    }
}
