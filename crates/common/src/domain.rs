mod clock;
mod command;
mod device;
mod log_entry;
mod result;

pub use clock::*;
pub use command::*;
pub use device::*;
pub use log_entry::*;
pub use result::*;
