mod command_dispatch_service;
mod command_publisher;
mod odor_type;
mod wire_payload;

pub use command_dispatch_service::*;
pub use command_publisher::*;
pub use odor_type::*;
pub use wire_payload::*;
