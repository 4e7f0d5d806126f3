use crate::domain::{
    AppendLogRepoInput, DeviceLogRepository, DomainError, DomainResult, LogEntry,
};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use tracing::instrument;

/// PostgreSQL implementation of DeviceLogRepository trait
#[derive(Clone)]
pub struct PostgresDeviceLogRepository {
    client: PostgresClient,
}

impl PostgresDeviceLogRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeviceLogRepository for PostgresDeviceLogRepository {
    #[instrument(skip(self, input), fields(device_id = %input.device_id, log_type = %input.log_type))]
    async fn append_log(&self, input: AppendLogRepoInput) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        conn.execute(
            "INSERT INTO logs (device_id, log_type, message) VALUES ($1, $2, $3)",
            &[&input.device_id, &input.log_type.as_str(), &input.message],
        )
        .await
        .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_device_logs(&self, device_id: &str, limit: i64) -> DomainResult<Vec<LogEntry>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                "SELECT id, device_id, log_type, message, created_at
                 FROM logs
                 WHERE device_id = $1
                 ORDER BY created_at DESC, id DESC
                 LIMIT $2",
                &[&device_id, &limit],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        rows.iter()
            .map(|row| {
                let log_type: String = row.get(2);
                Ok(LogEntry {
                    id: row.get(0),
                    device_id: row.get(1),
                    log_type: log_type.parse()?,
                    message: row.get(3),
                    created_at: row.get(4),
                })
            })
            .collect()
    }
}
