mod device_registry;
mod liveness_sweep;
mod presence_tracker;

pub use device_registry::*;
pub use liveness_sweep::*;
pub use presence_tracker::*;
