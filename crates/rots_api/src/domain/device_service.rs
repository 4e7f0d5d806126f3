use common::domain::{
    Device, DeviceLogRepository, DeviceRepository, DeviceType, DomainError, DomainResult,
    LogEntry, RegisterDeviceRepoInput,
};
use device_presence::domain::{DeviceRegistry, TrackedDevice};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Entries returned by the device log read
pub const DEVICE_LOG_LIMIT: i64 = 50;

/// Registration request before validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterDeviceInput {
    pub device_id: String,
    pub device_type: String,
    pub location: Option<String>,
}

/// Service for device records, logs and live presence
pub struct DeviceService {
    device_repository: Arc<dyn DeviceRepository>,
    log_repository: Arc<dyn DeviceLogRepository>,
    registry: Arc<DeviceRegistry>,
}

impl DeviceService {
    pub fn new(
        device_repository: Arc<dyn DeviceRepository>,
        log_repository: Arc<dyn DeviceLogRepository>,
        registry: Arc<DeviceRegistry>,
    ) -> Self {
        Self {
            device_repository,
            log_repository,
            registry,
        }
    }

    /// Create the device record, or update its location if it already exists
    #[instrument(skip(self, input), fields(device_id = %input.device_id))]
    pub async fn register_device(&self, input: RegisterDeviceInput) -> DomainResult<()> {
        if input.device_id.trim().is_empty() {
            return Err(DomainError::InvalidDeviceId(
                "Device ID cannot be empty".to_string(),
            ));
        }
        let device_type: DeviceType = input.device_type.parse()?;

        self.device_repository
            .register_device(RegisterDeviceRepoInput {
                device_id: input.device_id,
                device_type,
                location: input.location,
            })
            .await?;

        info!(device_type = %device_type, "device registered");
        Ok(())
    }

    /// Durable device records, most recently seen first
    pub async fn list_devices(&self) -> DomainResult<Vec<Device>> {
        self.device_repository.list_devices().await
    }

    #[instrument(skip(self))]
    pub async fn device_logs(&self, device_id: &str) -> DomainResult<Vec<LogEntry>> {
        debug!("listing device logs");
        self.log_repository
            .list_device_logs(device_id, DEVICE_LOG_LIMIT)
            .await
    }

    /// In-memory presence snapshot
    pub async fn presence(&self) -> Vec<TrackedDevice> {
        self.registry.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::domain::{ManualClock, MockDeviceLogRepository, MockDeviceRepository};
    use device_presence::domain::DeviceUpdate;
    use serde_json::Map;

    fn registry() -> Arc<DeviceRegistry> {
        Arc::new(DeviceRegistry::new(Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ))))
    }

    fn create_service(
        device_repo: MockDeviceRepository,
        log_repo: MockDeviceLogRepository,
    ) -> DeviceService {
        DeviceService::new(Arc::new(device_repo), Arc::new(log_repo), registry())
    }

    #[tokio::test]
    async fn test_register_device_success() {
        let mut device_repo = MockDeviceRepository::new();
        device_repo
            .expect_register_device()
            .withf(|input: &RegisterDeviceRepoInput| {
                input.device_id == "R1"
                    && input.device_type == DeviceType::Receiver
                    && input.location.as_deref() == Some("lobby")
            })
            .times(1)
            .returning(|_| Ok(()));

        let service = create_service(device_repo, MockDeviceLogRepository::new());
        let result = service
            .register_device(RegisterDeviceInput {
                device_id: "R1".to_string(),
                device_type: "receiver".to_string(),
                location: Some("lobby".to_string()),
            })
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_register_device_rejects_empty_id() {
        let mut device_repo = MockDeviceRepository::new();
        device_repo.expect_register_device().times(0);

        let service = create_service(device_repo, MockDeviceLogRepository::new());
        let result = service
            .register_device(RegisterDeviceInput {
                device_id: "  ".to_string(),
                device_type: "sender".to_string(),
                location: None,
            })
            .await;
        assert!(matches!(result, Err(DomainError::InvalidDeviceId(_))));
    }

    #[tokio::test]
    async fn test_register_device_rejects_unknown_type() {
        let mut device_repo = MockDeviceRepository::new();
        device_repo.expect_register_device().times(0);

        let service = create_service(device_repo, MockDeviceLogRepository::new());
        let result = service
            .register_device(RegisterDeviceInput {
                device_id: "X1".to_string(),
                device_type: "diffuser".to_string(),
                location: None,
            })
            .await;
        assert!(matches!(result, Err(DomainError::InvalidDeviceType(_))));
    }

    #[tokio::test]
    async fn test_device_logs_uses_limit() {
        let mut log_repo = MockDeviceLogRepository::new();
        log_repo
            .expect_list_device_logs()
            .withf(|device_id: &str, limit: &i64| device_id == "S1" && *limit == DEVICE_LOG_LIMIT)
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let service = create_service(MockDeviceRepository::new(), log_repo);
        assert!(service.device_logs("S1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_presence_reads_registry() {
        let registry = registry();
        registry
            .upsert("S1", DeviceUpdate::online(Map::new()))
            .await;

        let service = DeviceService::new(
            Arc::new(MockDeviceRepository::new()),
            Arc::new(MockDeviceLogRepository::new()),
            registry,
        );

        let presence = service.presence().await;
        assert_eq!(presence.len(), 1);
        assert_eq!(presence[0].device_id, "S1");
    }
}
