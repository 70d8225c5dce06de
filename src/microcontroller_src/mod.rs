pub mod board;
pub mod microcontroller;
pub mod peripherals;
pub(crate) mod interrupt_driver;
pub use self::microcontroller::Microcontroller;
