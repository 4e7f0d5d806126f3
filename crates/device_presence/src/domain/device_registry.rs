use chrono::{DateTime, Duration, Utc};
use common::domain::{Clock, DeviceStatus};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory view of one device's connectivity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedDevice {
    pub device_id: String,
    pub status: DeviceStatus,
    pub last_seen: DateTime<Utc>,
    /// Fields merged from the device's status events
    pub attributes: Map<String, Value>,
}

/// Partial update applied by [`DeviceRegistry::upsert`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceUpdate {
    /// Defaults to online when not set
    pub status: Option<DeviceStatus>,
    pub attributes: Map<String, Value>,
}

impl DeviceUpdate {
    pub fn online(attributes: Map<String, Value>) -> Self {
        Self {
            status: Some(DeviceStatus::Online),
            attributes,
        }
    }

    pub fn with_status(status: DeviceStatus) -> Self {
        Self {
            status: Some(status),
            attributes: Map::new(),
        }
    }
}

/// Result of [`DeviceRegistry::touch`]
#[derive(Debug, Clone, PartialEq)]
pub struct Touched {
    pub device: TrackedDevice,
    /// Status before the touch
    pub previous_status: DeviceStatus,
}

impl Touched {
    pub fn came_back_online(&self) -> bool {
        self.previous_status == DeviceStatus::Offline
    }
}

/// Process-owned registry of device presence, keyed by device id.
///
/// Not persisted: a restart starts from an empty registry and devices reappear
/// as they report in.
pub struct DeviceRegistry {
    devices: Arc<RwLock<HashMap<String, TrackedDevice>>>,
    clock: Arc<dyn Clock>,
}

impl DeviceRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            devices: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Merge `update` into the entry for `device_id`, creating it if needed.
    /// Always stamps `last_seen` with the current time.
    pub async fn upsert(&self, device_id: &str, update: DeviceUpdate) -> TrackedDevice {
        let now = self.clock.now();
        let status = update.status.unwrap_or(DeviceStatus::Online);

        let mut devices = self.devices.write().await;
        let entry = devices
            .entry(device_id.to_string())
            .or_insert_with(|| TrackedDevice {
                device_id: device_id.to_string(),
                status,
                last_seen: now,
                attributes: Map::new(),
            });

        entry.attributes.extend(update.attributes);
        entry.status = status;
        entry.last_seen = now;
        entry.clone()
    }

    /// Refresh an existing entry. Unknown devices are left absent.
    pub async fn touch(&self, device_id: &str) -> Option<Touched> {
        let now = self.clock.now();
        let mut devices = self.devices.write().await;
        let entry = devices.get_mut(device_id)?;
        let previous_status = entry.status;
        entry.last_seen = now;
        entry.status = DeviceStatus::Online;
        Some(Touched {
            device: entry.clone(),
            previous_status,
        })
    }

    pub async fn get(&self, device_id: &str) -> Option<TrackedDevice> {
        let devices = self.devices.read().await;
        devices.get(device_id).cloned()
    }

    /// Snapshot of all entries, most recently seen first
    pub async fn list(&self) -> Vec<TrackedDevice> {
        let devices = self.devices.read().await;
        let mut snapshot: Vec<TrackedDevice> = devices.values().cloned().collect();
        snapshot.sort_by(|a, b| {
            b.last_seen
                .cmp(&a.last_seen)
                .then_with(|| a.device_id.cmp(&b.device_id))
        });
        snapshot
    }

    /// Mark every entry not seen within `deadline` as offline.
    ///
    /// `last_seen` is left as is. Returns only the entries that changed.
    /// A deadline reaching before the representable time range expires nothing.
    pub async fn mark_stale_offline(&self, deadline: Duration) -> Vec<TrackedDevice> {
        let Some(cutoff) = self.clock.now().checked_sub_signed(deadline) else {
            return Vec::new();
        };
        let mut devices = self.devices.write().await;

        devices
            .values_mut()
            .filter(|device| device.status != DeviceStatus::Offline && device.last_seen < cutoff)
            .map(|device| {
                device.status = DeviceStatus::Offline;
                device.clone()
            })
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }
}
