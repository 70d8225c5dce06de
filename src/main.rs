//! Drives P9_14 at 70% and prints the reading of P9_36. Runs on the simulated BeagleBone
//! header, or on an ESP32-C6 when built with the `esp` feature, where P9_14 is GPIO5 and
//! P9_36 is GPIO6.

use std::{io, process};

use boneio::{
    sketches::{analog_read_write, AnalogReadWriteConfig},
    BoardError, Microcontroller, SharableRef, SharableRefExt,
};

fn main() {
    init_logger();

    let mut micro = match start_microcontroller() {
        Ok(micro) => micro,
        Err(err) => {
            log::error!("Could not start the board: {:?}", err);
            process::exit(1);
        }
    };

    let console = SharableRef::new_sharable(io::stdout());
    if let Err(err) = analog_read_write(&mut micro, &AnalogReadWriteConfig::default(), console) {
        log::error!("Analog read/write failed: {:?}", err);
        process::exit(1);
    }
}

#[cfg(all(feature = "std", not(feature = "esp")))]
fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[cfg(not(any(feature = "std", feature = "esp")))]
fn init_logger() {}

#[cfg(feature = "esp")]
fn init_logger() {
    esp_idf_svc::log::EspLogger::initialize_default();
}

#[cfg(not(feature = "esp"))]
fn start_microcontroller<'a>() -> Result<Microcontroller<'a>, BoardError> {
    Ok(Microcontroller::simulated())
}

#[cfg(feature = "esp")]
fn start_microcontroller<'a>() -> Result<Microcontroller<'a>, BoardError> {
    use boneio::boards::{esp::EspBoard, pin_tables};

    let table = pin_tables::esp32c6()
        .with_alias("P9_14", "GPIO5")
        .with_alias("P9_36", "GPIO6");
    Ok(Microcontroller::with_board(EspBoard::take()?.with_table(table)))
}
