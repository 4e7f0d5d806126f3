pub mod domain;
pub mod mqtt;

pub use domain::*;
pub use mqtt::*;
