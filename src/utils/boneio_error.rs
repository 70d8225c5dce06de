use crate::{
    gpio::{AnalogInError, AnalogOutError},
    microcontroller_src::{board::BoardError, microcontroller::PinModeError, peripherals::PeripheralError},
    mppt::ReadingCodecError,
};

/// Any error the framework can return, so sketches can use `?` on every call
#[derive(Debug, Clone, PartialEq)]
pub enum BoneIoError {
    AnalogInError(AnalogInError),
    AnalogOutError(AnalogOutError),
    BoardError(BoardError),
    PeripheralError(PeripheralError),
    PinModeError(PinModeError),
    ReadingCodecError(ReadingCodecError),
}

impl From<AnalogInError> for BoneIoError {
    fn from(value: AnalogInError) -> Self {
        BoneIoError::AnalogInError(value)
    }
}

impl From<AnalogOutError> for BoneIoError {
    fn from(value: AnalogOutError) -> Self {
        BoneIoError::AnalogOutError(value)
    }
}

impl From<BoardError> for BoneIoError {
    fn from(value: BoardError) -> Self {
        BoneIoError::BoardError(value)
    }
}

impl From<PeripheralError> for BoneIoError {
    fn from(value: PeripheralError) -> Self {
        BoneIoError::PeripheralError(value)
    }
}

impl From<PinModeError> for BoneIoError {
    fn from(value: PinModeError) -> Self {
        BoneIoError::PinModeError(value)
    }
}

impl From<ReadingCodecError> for BoneIoError {
    fn from(value: ReadingCodecError) -> Self {
        BoneIoError::ReadingCodecError(value)
    }
}
