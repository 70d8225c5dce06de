pub mod perturb_observe;
pub mod reading_codec;

pub use perturb_observe::*;
pub use reading_codec::{decode_reading, encode_reading, ReadingCodecError, FRAME_LEN};
