use std::collections::HashMap;

use crate::{gpio::PwmSettings, utils::auxiliary::same_pin_name};

/// Enums the different errors possible when resolving a pin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeripheralError {
    UnknownPin(String),
    NotAPwmPin(String),
    NotAnAnalogPin(String),
    InputOnlyPin(String),
}

/// Direction and pull configuration of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    InputPullup,
    InputPulldown,
    Output,
}

impl PinMode {
    pub fn is_input(&self) -> bool {
        !matches!(self, PinMode::Output)
    }
}

/// Identifies the PWM hardware behind a pin. On boards with a fixed routing (like the
/// BeagleBone header) `chip` and `channel` name the module and its output. Boards that
/// allocate channels dynamically may ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmChannel {
    pub chip: u8,
    pub channel: u8,
}

/// Static description of a physical pin
/// - `name`: Canonical name of the pin, for example "P9_14" or "GPIO5"
/// - `gpio`: GPIO number of the pin, if it can be used as a GPIO
/// - `pwm`: PWM hardware the pin can be muxed to
/// - `ain`: Index of the analog input the pin is wired to
/// - `input_only`: True for pins that can never be driven, like the BeagleBone AIN pins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinInfo {
    pub name: &'static str,
    pub gpio: Option<u8>,
    pub pwm: Option<PwmChannel>,
    pub ain: Option<u8>,
    pub input_only: bool,
}

impl PinInfo {
    pub const fn gpio(name: &'static str, gpio: u8) -> Self {
        PinInfo {
            name,
            gpio: Some(gpio),
            pwm: None,
            ain: None,
            input_only: false,
        }
    }

    pub const fn pwm(name: &'static str, gpio: u8, chip: u8, channel: u8) -> Self {
        PinInfo {
            name,
            gpio: Some(gpio),
            pwm: Some(PwmChannel { chip, channel }),
            ain: None,
            input_only: false,
        }
    }

    pub const fn analog_in(name: &'static str, ain: u8) -> Self {
        PinInfo {
            name,
            gpio: None,
            pwm: None,
            ain: Some(ain),
            input_only: true,
        }
    }

    pub fn can_pwm(&self) -> bool {
        self.pwm.is_some()
    }

    pub fn can_analog_in(&self) -> bool {
        self.ain.is_some()
    }
}

/// Set of pins a board exposes, plus optional aliases so that a sketch written for one
/// header can name the pins of another board.
#[derive(Debug, Clone, Default)]
pub struct PinTable {
    pins: Vec<PinInfo>,
    aliases: Vec<(String, &'static str)>,
}

impl PinTable {
    pub fn new(pins: Vec<PinInfo>) -> Self {
        PinTable {
            pins,
            aliases: Vec::new(),
        }
    }

    /// Makes `alias` resolve to the pin named `target`. Aliases are resolved only once,
    /// they cannot point to other aliases.
    pub fn with_alias(mut self, alias: &str, target: &'static str) -> Self {
        self.aliases.push((alias.to_string(), target));
        self
    }

    pub fn pins(&self) -> &[PinInfo] {
        &self.pins
    }

    /// Resolves a pin name or alias, ignoring case.
    ///
    /// # Errors
    ///
    /// - `PeripheralError::UnknownPin`: If neither a pin nor an alias has that name
    pub fn find(&self, name: &str) -> Result<&PinInfo, PeripheralError> {
        let target: &str = match self
            .aliases
            .iter()
            .find(|(alias, _)| same_pin_name(alias, name))
        {
            Some((_, target)) => *target,
            None => name,
        };

        self.pins
            .iter()
            .find(|pin| same_pin_name(pin.name, target))
            .ok_or_else(|| PeripheralError::UnknownPin(name.to_string()))
    }
}

/// Keeps track of the pins of the board and the state the framework set on them:
/// the mode of each configured pin and the last PWM output applied.
pub struct Peripherals {
    table: PinTable,
    modes: HashMap<&'static str, PinMode>,
    pwm_outputs: HashMap<&'static str, PwmSettings>,
}

impl Peripherals {
    pub fn new(table: PinTable) -> Peripherals {
        Peripherals {
            table,
            modes: HashMap::new(),
            pwm_outputs: HashMap::new(),
        }
    }

    pub fn get_pin(&self, name: &str) -> Result<PinInfo, PeripheralError> {
        self.table.find(name).cloned()
    }

    /// Resolves a pin that can be driven with the given mode
    pub fn get_pin_for_mode(&self, name: &str, mode: PinMode) -> Result<PinInfo, PeripheralError> {
        let pin = self.get_pin(name)?;
        if pin.input_only && !mode.is_input() {
            return Err(PeripheralError::InputOnlyPin(name.to_string()));
        }
        Ok(pin)
    }

    pub fn get_pwm_pin(&self, name: &str) -> Result<PinInfo, PeripheralError> {
        let pin = self.get_pin(name)?;
        if !pin.can_pwm() {
            return Err(PeripheralError::NotAPwmPin(name.to_string()));
        }
        Ok(pin)
    }

    pub fn get_analog_pin(&self, name: &str) -> Result<PinInfo, PeripheralError> {
        let pin = self.get_pin(name)?;
        if !pin.can_analog_in() {
            return Err(PeripheralError::NotAnAnalogPin(name.to_string()));
        }
        Ok(pin)
    }

    pub fn set_mode(&mut self, pin: &PinInfo, mode: PinMode) {
        self.modes.insert(pin.name, mode);
    }

    pub fn mode_of(&self, pin: &PinInfo) -> Option<PinMode> {
        self.modes.get(pin.name).copied()
    }

    pub fn set_pwm_output(&mut self, pin: &PinInfo, settings: PwmSettings) {
        self.pwm_outputs.insert(pin.name, settings);
    }

    pub fn pwm_output_of(&self, pin: &PinInfo) -> Option<PwmSettings> {
        self.pwm_outputs.get(pin.name).copied()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn table() -> PinTable {
        PinTable::new(vec![
            PinInfo::pwm("P9_14", 50, 1, 0),
            PinInfo::analog_in("P9_36", 5),
            PinInfo::gpio("USR0", 53),
        ])
        .with_alias("LED", "USR0")
    }

    #[test]
    fn test0_find_ignores_case_and_follows_aliases() {
        let table = table();
        assert_eq!(table.find("p9_14").unwrap().name, "P9_14");
        assert_eq!(table.find("led").unwrap().name, "USR0");
        assert_eq!(
            table.find("P8_99"),
            Err(PeripheralError::UnknownPin("P8_99".to_string()))
        );
    }

    #[test]
    fn test1_capability_checks() {
        let peripherals = Peripherals::new(table());
        assert!(peripherals.get_pwm_pin("P9_14").is_ok());
        assert_eq!(
            peripherals.get_pwm_pin("P9_36"),
            Err(PeripheralError::NotAPwmPin("P9_36".to_string()))
        );
        assert_eq!(
            peripherals.get_analog_pin("USR0"),
            Err(PeripheralError::NotAnAnalogPin("USR0".to_string()))
        );
        assert_eq!(
            peripherals.get_pin_for_mode("P9_36", PinMode::Output),
            Err(PeripheralError::InputOnlyPin("P9_36".to_string()))
        );
        assert!(peripherals.get_pin_for_mode("P9_36", PinMode::Input).is_ok());
    }

    #[test]
    fn test2_modes_are_stored_by_canonical_name() {
        let mut peripherals = Peripherals::new(table());
        let pin = peripherals.get_pin("led").unwrap();
        peripherals.set_mode(&pin, PinMode::Output);
        let same_pin = peripherals.get_pin("USR0").unwrap();
        assert_eq!(peripherals.mode_of(&same_pin), Some(PinMode::Output));
    }
}
