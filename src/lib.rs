mod utils;
mod microcontroller_src;

pub mod boards;
pub mod gpio;
pub mod mppt;
pub mod sketches;

pub use microcontroller_src::board::{Board, BoardError};
pub use microcontroller_src::microcontroller::PinModeError;
pub use microcontroller_src::peripherals::{PeripheralError, PinInfo, PinTable, PwmChannel};
pub use microcontroller_src::Microcontroller;
pub use utils::auxiliary::{SharableRef, SharableRefExt};
pub use utils::boneio_error;
pub use utils::notification::{Notification, Notifier};
