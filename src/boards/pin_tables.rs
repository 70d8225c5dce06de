use crate::microcontroller_src::peripherals::{PinInfo, PinTable};

/// P8 and P9 header pins of the BeagleBone Black reachable from the framework.
///
/// PWM pins carry the `(chip, channel)` of the module behind them: eHRPWM0-2 are chips 0-2 and
/// the eCAP PWMs are chips 3 and 4. AIN pins accept at most 1.8V and are input only.
pub fn beaglebone_black() -> PinTable {
    PinTable::new(vec![
        PinInfo::pwm("P8_13", 23, 2, 1),
        PinInfo::pwm("P8_19", 22, 2, 0),
        PinInfo::pwm("P8_34", 81, 1, 1),
        PinInfo::pwm("P8_36", 80, 1, 0),
        PinInfo::pwm("P8_45", 70, 2, 0),
        PinInfo::pwm("P8_46", 71, 2, 1),
        PinInfo::pwm("P9_14", 50, 1, 0),
        PinInfo::pwm("P9_16", 51, 1, 1),
        PinInfo::pwm("P9_21", 3, 0, 1),
        PinInfo::pwm("P9_22", 2, 0, 0),
        PinInfo::pwm("P9_28", 113, 4, 0),
        PinInfo::pwm("P9_29", 111, 0, 1),
        PinInfo::pwm("P9_31", 110, 0, 0),
        PinInfo::pwm("P9_42", 7, 3, 0),
        PinInfo::analog_in("P9_39", 0),
        PinInfo::analog_in("P9_40", 1),
        PinInfo::analog_in("P9_37", 2),
        PinInfo::analog_in("P9_38", 3),
        PinInfo::analog_in("P9_33", 4),
        PinInfo::analog_in("P9_36", 5),
        PinInfo::analog_in("P9_35", 6),
        PinInfo::gpio("USR0", 53),
        PinInfo::gpio("USR1", 54),
        PinInfo::gpio("USR2", 55),
        PinInfo::gpio("USR3", 56),
    ])
}

/// GPIOs of the ESP32-C6 usable by the framework. GPIO14 is not exposed. Every pin can be
/// routed to the LEDC, so all of them are PWM capable; only GPIO0 to GPIO6 reach ADC1.
pub fn esp32c6() -> PinTable {
    const NAMES: [&str; 24] = [
        "GPIO0", "GPIO1", "GPIO2", "GPIO3", "GPIO4", "GPIO5", "GPIO6", "GPIO7", "GPIO8", "GPIO9",
        "GPIO10", "GPIO11", "GPIO12", "GPIO13", "GPIO14", "GPIO15", "GPIO16", "GPIO17", "GPIO18",
        "GPIO19", "GPIO20", "GPIO21", "GPIO22", "GPIO23",
    ];
    let pins = NAMES
        .iter()
        .enumerate()
        .filter(|(gpio, _)| *gpio != 14)
        .map(|(gpio, name)| {
            let gpio = gpio as u8;
            let mut pin = PinInfo::pwm(*name, gpio, 0, gpio);
            if gpio <= 6 {
                pin.ain = Some(gpio);
            }
            pin
        })
        .collect();
    PinTable::new(pins)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test0_beaglebone_pins_used_by_the_sketches() {
        let table = beaglebone_black();
        let pwm = table.find("P9_14").unwrap();
        assert!(pwm.can_pwm());
        assert!(!pwm.input_only);
        let ain = table.find("P9_36").unwrap();
        assert_eq!(ain.ain, Some(5));
        assert!(ain.input_only);
        assert_eq!(table.pins().iter().filter(|p| p.can_analog_in()).count(), 7);
    }

    #[test]
    fn test1_esp32c6_skips_gpio14() {
        let table = esp32c6();
        assert_eq!(table.pins().len(), 23);
        assert!(table.find("GPIO14").is_err());
        assert_eq!(table.find("gpio6").unwrap().ain, Some(6));
        assert_eq!(table.find("GPIO7").unwrap().ain, None);
        assert!(table.find("GPIO23").unwrap().can_pwm());
    }
}
