use crate::domain::result::{DomainError, DomainResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a command record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Pending,
    Sent,
    Executed,
    Failed,
}

impl CommandStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandStatus::Pending => "pending",
            CommandStatus::Sent => "sent",
            CommandStatus::Executed => "executed",
            CommandStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s {
            "pending" => Ok(CommandStatus::Pending),
            "sent" => Ok(CommandStatus::Sent),
            "executed" => Ok(CommandStatus::Executed),
            "failed" => Ok(CommandStatus::Failed),
            other => Err(DomainError::RepositoryError(anyhow::anyhow!(
                "unknown command status '{}'",
                other
            ))),
        }
    }
}

/// Durable record of a requested odor command.
///
/// `intensity` and `duration` are stored as requested; the clamped values only
/// exist on the wire payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    pub id: i64,
    pub sender_id: String,
    pub receiver_id: String,
    pub odor_type: String,
    pub intensity: i64,
    pub duration: i64,
    pub status: CommandStatus,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

/// Input for inserting a command row. New rows always start as pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCommandRepoInput {
    pub sender_id: String,
    pub receiver_id: String,
    pub odor_type: String,
    pub intensity: i64,
    pub duration: i64,
}

/// Repository trait for command persistence operations
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommandRepository: Send + Sync {
    /// Insert a pending command and return it with its store-assigned id
    async fn create_command(&self, input: CreateCommandRepoInput) -> DomainResult<Command>;

    /// Most recent commands, newest first
    async fn list_recent_commands(&self, limit: i64) -> DomainResult<Vec<Command>>;
}
