pub mod pin_tables;
pub mod sim;

#[cfg(feature = "esp")]
pub mod esp;
