use crate::domain::result::{DomainError, DomainResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a field device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Sender,
    Receiver,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Sender => "sender",
            DeviceType::Receiver => "receiver",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s {
            "sender" => Ok(DeviceType::Sender),
            "receiver" => Ok(DeviceType::Receiver),
            other => Err(DomainError::InvalidDeviceType(format!(
                "'{}' is not one of sender, receiver",
                other
            ))),
        }
    }
}

/// Connectivity state of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
    Error,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Online => "online",
            DeviceStatus::Offline => "offline",
            DeviceStatus::Error => "error",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s {
            "online" => Ok(DeviceStatus::Online),
            "offline" => Ok(DeviceStatus::Offline),
            "error" => Ok(DeviceStatus::Error),
            other => Err(DomainError::RepositoryError(anyhow::anyhow!(
                "unknown device status '{}'",
                other
            ))),
        }
    }
}

/// Durable device record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub device_id: String,
    pub device_type: DeviceType,
    pub location: Option<String>,
    pub status: DeviceStatus,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a device (location is updated on conflict)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterDeviceRepoInput {
    pub device_id: String,
    pub device_type: DeviceType,
    pub location: Option<String>,
}

/// Input for mirroring a presence transition into the durable store
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateDeviceStatusRepoInput {
    pub device_id: String,
    pub status: DeviceStatus,
    /// `None` leaves the stored `last_seen` untouched
    pub last_seen: Option<DateTime<Utc>>,
}

/// Repository trait for device persistence operations
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Insert a device or update its location if it already exists
    async fn register_device(&self, input: RegisterDeviceRepoInput) -> DomainResult<()>;

    /// List all devices ordered by last_seen descending
    async fn list_devices(&self) -> DomainResult<Vec<Device>>;

    /// Update status (and optionally last_seen). Returns the number of rows touched,
    /// which is zero for devices that were never registered.
    async fn update_device_status(&self, input: UpdateDeviceStatusRepoInput) -> DomainResult<u64>;
}
