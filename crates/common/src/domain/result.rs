use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid device ID: {0}")]
    InvalidDeviceId(String),

    #[error("Invalid device type: {0}")]
    InvalidDeviceType(String),

    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Invalid broker configuration: {0}")]
    InvalidBrokerConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Publish error: {0}")]
    PublishError(String),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}
