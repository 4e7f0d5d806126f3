use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::domain::DomainError;
use serde_json::json;
use tracing::{error, warn};

/// Error returned by HTTP handlers, rendered as `{"error": "<message>"}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Map a domain error to its HTTP status. Store and bus details are logged,
/// not returned to the client.
pub fn domain_error_to_api_error(error: DomainError) -> ApiError {
    match error {
        DomainError::ValidationError(msg)
        | DomainError::InvalidDeviceId(msg)
        | DomainError::InvalidDeviceType(msg) => ApiError::bad_request(msg),

        DomainError::PublishError(msg) => {
            error!(error = %msg, "command publish failed");
            ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "Failed to publish command")
        }

        DomainError::RepositoryError(err) => {
            error!(error = %err, "repository error");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        }

        other => {
            error!(error = %other, "unexpected error");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        domain_error_to_api_error(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "rejected request body");
        ApiError::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = domain_error_to_api_error(DomainError::ValidationError(
            "Missing required parameters".to_string(),
        ));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Missing required parameters");

        let err = domain_error_to_api_error(DomainError::InvalidDeviceType("bad".to_string()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_infrastructure_errors_hide_details() {
        let err = domain_error_to_api_error(DomainError::RepositoryError(anyhow::anyhow!(
            "connection refused to 10.0.0.3"
        )));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Database error");

        let err = domain_error_to_api_error(DomainError::PublishError("timeout".to_string()));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
