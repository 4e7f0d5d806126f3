mod command_handler;
mod device_handler;
mod error;
mod server;

pub use error::*;
pub use server::*;
