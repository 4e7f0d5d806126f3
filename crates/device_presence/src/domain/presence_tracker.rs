use crate::domain::{DeviceRegistry, DeviceUpdate, TrackedDevice};
use common::domain::{
    AppendLogRepoInput, DeviceLogRepository, DeviceRepository, DeviceStatus, LogType,
    UpdateDeviceStatusRepoInput,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Body of an `error` presence event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorReport {
    pub message: Option<String>,
}

/// Applies presence events to the registry and mirrors them to the durable store.
///
/// Durable writes are awaited but best-effort: a failed mirror or log append is
/// logged and the in-memory transition still stands.
pub struct PresenceTracker {
    registry: Arc<DeviceRegistry>,
    device_repository: Arc<dyn DeviceRepository>,
    log_repository: Arc<dyn DeviceLogRepository>,
}

impl PresenceTracker {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        device_repository: Arc<dyn DeviceRepository>,
        log_repository: Arc<dyn DeviceLogRepository>,
    ) -> Self {
        Self {
            registry,
            device_repository,
            log_repository,
        }
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Device reported its status: online, payload merged, last_seen refreshed
    #[instrument(skip(self, payload), fields(device_id = %device_id))]
    pub async fn handle_status(&self, device_id: &str, payload: Map<String, Value>) -> TrackedDevice {
        let message = format!("Device status updated: {}", Value::Object(payload.clone()));

        let device = self
            .registry
            .upsert(device_id, DeviceUpdate::online(payload))
            .await;

        self.mirror_status(UpdateDeviceStatusRepoInput {
            device_id: device_id.to_string(),
            status: DeviceStatus::Online,
            last_seen: Some(device.last_seen),
        })
        .await;
        self.append_log(device_id, LogType::Info, message).await;

        debug!(status = %device.status, "applied status event");
        device
    }

    /// Device reported a fault: error status, previously merged fields kept
    #[instrument(skip(self, report), fields(device_id = %device_id))]
    pub async fn handle_error(&self, device_id: &str, report: ErrorReport) -> TrackedDevice {
        let device = self
            .registry
            .upsert(device_id, DeviceUpdate::with_status(DeviceStatus::Error))
            .await;

        self.mirror_status(UpdateDeviceStatusRepoInput {
            device_id: device_id.to_string(),
            status: DeviceStatus::Error,
            last_seen: None,
        })
        .await;

        let message = format!(
            "Device error: {}",
            report.message.as_deref().unwrap_or("unspecified")
        );
        self.append_log(device_id, LogType::Error, message).await;

        debug!(status = %device.status, "applied error event");
        device
    }

    /// Heartbeats refresh known devices only; they never create an entry.
    ///
    /// The durable store is written only when the heartbeat brings a device
    /// back from offline.
    #[instrument(skip(self), fields(device_id = %device_id))]
    pub async fn handle_heartbeat(&self, device_id: &str) -> Option<TrackedDevice> {
        let Some(touched) = self.registry.touch(device_id).await else {
            debug!("heartbeat from unknown device ignored");
            return None;
        };

        if touched.came_back_online() {
            self.mirror_status(UpdateDeviceStatusRepoInput {
                device_id: device_id.to_string(),
                status: DeviceStatus::Online,
                last_seen: Some(touched.device.last_seen),
            })
            .await;
        }

        Some(touched.device)
    }

    /// Mirror an offline transition made by the liveness sweep
    #[instrument(skip(self, device), fields(device_id = %device.device_id))]
    pub async fn handle_liveness_expired(&self, device: &TrackedDevice, deadline_secs: u64) {
        self.mirror_status(UpdateDeviceStatusRepoInput {
            device_id: device.device_id.clone(),
            status: DeviceStatus::Offline,
            last_seen: None,
        })
        .await;

        let message = format!(
            "Device marked offline: no presence event within {}s",
            deadline_secs
        );
        self.append_log(&device.device_id, LogType::Warning, message)
            .await;
    }

    async fn mirror_status(&self, input: UpdateDeviceStatusRepoInput) {
        let status = input.status;
        match self.device_repository.update_device_status(input).await {
            Ok(0) => debug!(%status, "device not registered, durable status unchanged"),
            Ok(_) => debug!(%status, "mirrored device status"),
            Err(e) => error!(error = %e, %status, "failed to mirror device status"),
        }
    }

    async fn append_log(&self, device_id: &str, log_type: LogType, message: String) {
        let input = AppendLogRepoInput {
            device_id: device_id.to_string(),
            log_type,
            message,
        };
        if let Err(e) = self.log_repository.append_log(input).await {
            error!(error = %e, %log_type, "failed to append device log");
        }
    }
}
