//! Programs written against the framework, the way a user would write them.

pub mod analog_read_write;
pub mod perturb_and_observe;

pub use analog_read_write::{analog_read_write, AnalogReadWriteConfig};
pub use perturb_and_observe::{perturb_and_observe, MpptConfig, MpptReport};
