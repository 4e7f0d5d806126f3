use crate::domain::{
    Command, CommandRepository, CreateCommandRepoInput, DomainError, DomainResult,
};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;
use tracing::{debug, instrument};

const COMMAND_COLUMNS: &str =
    "id, sender_id, receiver_id, odor_type, intensity, duration, status, created_at, executed_at";

/// Command row as stored in PostgreSQL
#[derive(Debug, Clone)]
pub struct CommandRow {
    pub id: i64,
    pub sender_id: String,
    pub receiver_id: String,
    pub odor_type: String,
    pub intensity: i64,
    pub duration: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl From<&Row> for CommandRow {
    fn from(row: &Row) -> Self {
        CommandRow {
            id: row.get(0),
            sender_id: row.get(1),
            receiver_id: row.get(2),
            odor_type: row.get(3),
            intensity: row.get(4),
            duration: row.get(5),
            status: row.get(6),
            created_at: row.get(7),
            executed_at: row.get(8),
        }
    }
}

impl TryFrom<CommandRow> for Command {
    type Error = DomainError;

    fn try_from(row: CommandRow) -> DomainResult<Self> {
        Ok(Command {
            id: row.id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            odor_type: row.odor_type,
            intensity: row.intensity,
            duration: row.duration,
            status: row.status.parse()?,
            created_at: row.created_at,
            executed_at: row.executed_at,
        })
    }
}

/// PostgreSQL implementation of CommandRepository trait
#[derive(Clone)]
pub struct PostgresCommandRepository {
    client: PostgresClient,
}

impl PostgresCommandRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CommandRepository for PostgresCommandRepository {
    #[instrument(skip(self, input), fields(sender_id = %input.sender_id, receiver_id = %input.receiver_id))]
    async fn create_command(&self, input: CreateCommandRepoInput) -> DomainResult<Command> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_one(
                &format!(
                    "INSERT INTO commands (sender_id, receiver_id, odor_type, intensity, duration)
                     VALUES ($1, $2, $3, $4, $5)
                     RETURNING {}",
                    COMMAND_COLUMNS
                ),
                &[
                    &input.sender_id,
                    &input.receiver_id,
                    &input.odor_type,
                    &input.intensity,
                    &input.duration,
                ],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        let command = Command::try_from(CommandRow::from(&row))?;
        debug!(command_id = command.id, "stored command");
        Ok(command)
    }

    #[instrument(skip(self))]
    async fn list_recent_commands(&self, limit: i64) -> DomainResult<Vec<Command>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                &format!(
                    "SELECT {} FROM commands ORDER BY created_at DESC, id DESC LIMIT $1",
                    COMMAND_COLUMNS
                ),
                &[&limit],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        rows.iter()
            .map(|row| Command::try_from(CommandRow::from(row)))
            .collect()
    }
}
