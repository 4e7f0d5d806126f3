pub mod domain;
pub mod http;
mod rots_api;

pub use rots_api::*;
