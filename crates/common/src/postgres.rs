mod client;
mod command_repository;
mod device_log_repository;
mod device_repository;
mod schema;

pub use client::*;
pub use command_repository::*;
pub use device_log_repository::*;
pub use device_repository::*;
pub use schema::*;
