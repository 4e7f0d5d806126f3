use crate::domain::result::{DomainError, DomainResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    Info,
    Warning,
    Error,
}

impl LogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::Info => "info",
            LogType::Warning => "warning",
            LogType::Error => "error",
        }
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogType {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s {
            "info" => Ok(LogType::Info),
            "warning" => Ok(LogType::Warning),
            "error" => Ok(LogType::Error),
            other => Err(DomainError::RepositoryError(anyhow::anyhow!(
                "unknown log type '{}'",
                other
            ))),
        }
    }
}

/// Append-only audit record of a device event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub id: i64,
    pub device_id: String,
    pub log_type: LogType,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendLogRepoInput {
    pub device_id: String,
    pub log_type: LogType,
    pub message: String,
}

/// Repository trait for the device event log
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeviceLogRepository: Send + Sync {
    async fn append_log(&self, input: AppendLogRepoInput) -> DomainResult<()>;

    /// Most recent entries for one device, newest first
    async fn list_device_logs(&self, device_id: &str, limit: i64) -> DomainResult<Vec<LogEntry>>;
}
