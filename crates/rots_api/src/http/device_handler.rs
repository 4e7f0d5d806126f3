use crate::domain::RegisterDeviceInput;
use crate::http::{ApiError, ApiState};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use common::domain::{Device, LogEntry};
use device_presence::domain::TrackedDevice;
use serde::{Deserialize, Serialize};
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct RegisterDeviceRequest {
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub device_type: String,
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub async fn list_devices(State(state): State<ApiState>) -> Result<Json<Vec<Device>>, ApiError> {
    let devices = state.device_service.list_devices().await?;
    Ok(Json(devices))
}

pub async fn device_presence(State(state): State<ApiState>) -> Json<Vec<TrackedDevice>> {
    Json(state.device_service.presence().await)
}

#[instrument(name = "RegisterDevice", skip_all)]
pub async fn register_device(
    State(state): State<ApiState>,
    body: Result<Json<RegisterDeviceRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = body?;

    state
        .device_service
        .register_device(RegisterDeviceInput {
            device_id: request.device_id,
            device_type: request.device_type,
            location: request.location,
        })
        .await?;

    Ok(Json(MessageResponse {
        message: "Device registered successfully",
    }))
}

pub async fn device_logs(
    State(state): State<ApiState>,
    Path(device_id): Path<String>,
) -> Result<Json<Vec<LogEntry>>, ApiError> {
    let logs = state.device_service.device_logs(&device_id).await?;
    Ok(Json(logs))
}
