pub mod domain;
pub mod mqtt;
pub mod postgres;
pub mod telemetry;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use domain::MockCommandRepository;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockDeviceLogRepository;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockDeviceRepository;
#[cfg(any(test, feature = "testing"))]
pub use mqtt::MockMqttPublisher;
