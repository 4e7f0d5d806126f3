use crate::domain::{
    Device, DeviceRepository, DomainError, DomainResult, RegisterDeviceRepoInput,
    UpdateDeviceStatusRepoInput,
};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;
use tracing::{debug, instrument};

/// Device row as stored in PostgreSQL
#[derive(Debug, Clone)]
pub struct DeviceRow {
    pub device_id: String,
    pub device_type: String,
    pub location: Option<String>,
    pub status: String,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<&Row> for DeviceRow {
    fn from(row: &Row) -> Self {
        DeviceRow {
            device_id: row.get(0),
            device_type: row.get(1),
            location: row.get(2),
            status: row.get(3),
            last_seen: row.get(4),
            created_at: row.get(5),
        }
    }
}

impl TryFrom<DeviceRow> for Device {
    type Error = DomainError;

    fn try_from(row: DeviceRow) -> DomainResult<Self> {
        Ok(Device {
            device_id: row.device_id,
            device_type: row.device_type.parse()?,
            location: row.location,
            status: row.status.parse()?,
            last_seen: row.last_seen,
            created_at: row.created_at,
        })
    }
}

/// PostgreSQL implementation of DeviceRepository trait
#[derive(Clone)]
pub struct PostgresDeviceRepository {
    client: PostgresClient,
}

impl PostgresDeviceRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeviceRepository for PostgresDeviceRepository {
    #[instrument(skip(self, input), fields(device_id = %input.device_id, device_type = %input.device_type))]
    async fn register_device(&self, input: RegisterDeviceRepoInput) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        conn.execute(
            "INSERT INTO devices (device_id, device_type, location)
             VALUES ($1, $2, $3)
             ON CONFLICT (device_id) DO UPDATE SET location = EXCLUDED.location",
            &[&input.device_id, &input.device_type.as_str(), &input.location],
        )
        .await
        .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!("registered device: {}", input.device_id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_devices(&self) -> DomainResult<Vec<Device>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                "SELECT device_id, device_type, location, status, last_seen, created_at
                 FROM devices
                 ORDER BY last_seen DESC",
                &[],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        rows.iter()
            .map(|row| Device::try_from(DeviceRow::from(row)))
            .collect()
    }

    #[instrument(skip(self, input), fields(device_id = %input.device_id, status = %input.status))]
    async fn update_device_status(&self, input: UpdateDeviceStatusRepoInput) -> DomainResult<u64> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let updated = match input.last_seen {
            Some(last_seen) => conn
                .execute(
                    "UPDATE devices SET status = $1, last_seen = $2 WHERE device_id = $3",
                    &[&input.status.as_str(), &last_seen, &input.device_id],
                )
                .await,
            None => conn
                .execute(
                    "UPDATE devices SET status = $1 WHERE device_id = $2",
                    &[&input.status.as_str(), &input.device_id],
                )
                .await,
        }
        .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!(rows = updated, "updated device status");
        Ok(updated)
    }
}
