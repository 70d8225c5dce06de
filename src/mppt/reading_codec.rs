/// Size of an encoded reading, the payload of a single CAN frame
pub const FRAME_LEN: usize = 8;

/// Digits kept after the decimal point
const DECIMALS: usize = 4;
const SCALE: f32 = 10000.0;
/// Largest scaled value that still fits in a frame: 7 digits and the point
const MAX_SCALED: u32 = 9_999_999;

#[derive(Debug, Clone, PartialEq)]
pub enum ReadingCodecError {
    OutOfRange(f32),
    Malformed,
}

/// Encodes a reading as fixed width ASCII: the value is truncated to 4 decimals and written
/// right aligned, with unused leading bytes left as NUL. For example `23.2345` becomes
/// `"\023.2345"` and `0.5` becomes `"\0\0\0.5000"`.
///
/// # Errors
///
/// - `ReadingCodecError::OutOfRange`: If the value is negative, not finite or does not fit in
///     the frame (1000 or more)
pub fn encode_reading(value: f32) -> Result<[u8; FRAME_LEN], ReadingCodecError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ReadingCodecError::OutOfRange(value));
    }
    let scaled = value * SCALE;
    if scaled > MAX_SCALED as f32 {
        return Err(ReadingCodecError::OutOfRange(value));
    }

    let mut frame = [0u8; FRAME_LEN];
    let mut remaining = scaled as u32;
    let mut position = FRAME_LEN;
    let mut written = 0;
    while remaining > 0 {
        position -= 1;
        frame[position] = b'0' + (remaining % 10) as u8;
        written += 1;
        remaining /= 10;
        if written == DECIMALS {
            position -= 1;
            frame[position] = b'.';
        }
    }
    Ok(frame)
}

/// Decodes a frame written by [encode_reading]. A frame without a point holds only decimals,
/// so `"\0\0\0\0\0\0\05"` is `0.0005`, and an all NUL frame is 0.
///
/// # Errors
///
/// - `ReadingCodecError::Malformed`: If the bytes are not a reading
pub fn decode_reading(frame: &[u8; FRAME_LEN]) -> Result<f32, ReadingCodecError> {
    let start = frame.iter().position(|b| *b != 0).unwrap_or(FRAME_LEN);
    let text = &frame[start..];

    let (whole, decimals) = match text.iter().position(|b| *b == b'.') {
        Some(point) => (&text[..point], &text[point + 1..]),
        None => (&text[..0], text),
    };
    let has_point = whole.len() + decimals.len() < text.len();
    if (has_point && decimals.len() != DECIMALS) || decimals.len() > DECIMALS {
        return Err(ReadingCodecError::Malformed);
    }

    let mut scaled: u32 = 0;
    for byte in whole.iter().chain(decimals.iter()) {
        if !byte.is_ascii_digit() {
            return Err(ReadingCodecError::Malformed);
        }
        scaled = scaled * 10 + (byte - b'0') as u32;
    }
    Ok(scaled as f32 / SCALE)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test0_encodes_right_aligned_with_four_decimals() {
        assert_eq!(&encode_reading(23.2345).unwrap(), b"\023.2345");
        assert_eq!(&encode_reading(120.1234).unwrap(), b"120.1234");
        assert_eq!(&encode_reading(2.5343).unwrap(), b"\0\02.5343");
        assert_eq!(&encode_reading(0.5).unwrap(), b"\0\0\0.5000");
    }

    #[test]
    fn test1_tiny_values_have_no_point() {
        assert_eq!(encode_reading(0.0).unwrap(), [0u8; FRAME_LEN]);
        assert_eq!(&encode_reading(0.0005).unwrap(), b"\0\0\0\0\0\0\05");
    }

    #[test]
    fn test2_out_of_range_values_fail() {
        assert_eq!(encode_reading(1980.2343), Err(ReadingCodecError::OutOfRange(1980.2343)));
        assert_eq!(encode_reading(-1.0), Err(ReadingCodecError::OutOfRange(-1.0)));
        assert!(encode_reading(f32::NAN).is_err());
        assert!(encode_reading(f32::INFINITY).is_err());
        assert!(encode_reading(999.9).is_ok());
    }

    #[test]
    fn test3_decodes_frames() {
        assert!((decode_reading(b"\023.2345").unwrap() - 23.2345).abs() < 1e-4);
        assert_eq!(decode_reading(b"\0\0\0.5000"), Ok(0.5));
        assert_eq!(decode_reading(&[0u8; FRAME_LEN]), Ok(0.0));
        assert_eq!(decode_reading(b"\0\0\0\0\0\0\05"), Ok(0.0005));
    }

    #[test]
    fn test4_rejects_malformed_frames() {
        assert_eq!(decode_reading(b"\023.23a5"), Err(ReadingCodecError::Malformed));
        assert_eq!(decode_reading(b"\0\0123.45"), Err(ReadingCodecError::Malformed));
        assert_eq!(decode_reading(b"\0\0\012345"), Err(ReadingCodecError::Malformed));
        assert_eq!(decode_reading(b"2\0\0.5000"), Err(ReadingCodecError::Malformed));
    }
}
