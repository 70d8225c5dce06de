pub mod auxiliary;
pub mod boneio_error;
pub mod notification;
