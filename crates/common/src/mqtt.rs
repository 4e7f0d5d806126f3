mod connection;
mod publisher;

pub use connection::*;
pub use publisher::*;

/// Root segment shared by every ROTS topic
pub const TOPIC_ROOT: &str = "rots";
