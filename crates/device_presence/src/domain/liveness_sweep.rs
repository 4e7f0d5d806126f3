use crate::domain::{PresenceTracker, TrackedDevice};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct LivenessSweepConfig {
    /// Silence after which a device is considered offline
    pub deadline_secs: u64,
    pub interval: Duration,
}

impl Default for LivenessSweepConfig {
    fn default() -> Self {
        // Senders heartbeat every 30s; three missed beats mark the device offline
        Self {
            deadline_secs: 90,
            interval: Duration::from_secs(15),
        }
    }
}

/// Marks silent devices offline and mirrors the transition to the durable store
pub struct LivenessSweep {
    tracker: Arc<PresenceTracker>,
    config: LivenessSweepConfig,
}

impl LivenessSweep {
    pub fn new(tracker: Arc<PresenceTracker>, config: LivenessSweepConfig) -> Self {
        Self { tracker, config }
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    pub async fn sweep_once(&self) -> Vec<TrackedDevice> {
        let deadline = i64::try_from(self.config.deadline_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX);
        let expired = self.tracker.registry().mark_stale_offline(deadline).await;

        for device in &expired {
            info!(
                device_id = %device.device_id,
                last_seen = %device.last_seen,
                "device marked offline"
            );
            self.tracker
                .handle_liveness_expired(device, self.config.deadline_secs)
                .await;
        }

        expired
    }
}
