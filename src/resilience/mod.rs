pub mod error;
pub mod fan_out;
