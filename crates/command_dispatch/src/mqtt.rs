mod mqtt_command_publisher;

pub use mqtt_command_publisher::*;
