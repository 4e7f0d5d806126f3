pub mod domain;
pub mod mqtt;
mod device_presence;

pub use device_presence::*;
