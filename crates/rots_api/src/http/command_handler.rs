use crate::http::{ApiError, ApiState};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use command_dispatch::DispatchCommandInput;
use common::domain::Command;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Body of a send request. Missing fields are rejected by the dispatcher.
#[derive(Debug, Deserialize)]
pub struct SendCommandRequest {
    pub sender_id: Option<String>,
    pub receiver_id: Option<String>,
    pub odor_type: Option<String>,
    pub intensity: Option<i64>,
    pub duration: Option<i64>,
}

impl From<SendCommandRequest> for DispatchCommandInput {
    fn from(request: SendCommandRequest) -> Self {
        DispatchCommandInput {
            sender_id: request.sender_id,
            receiver_id: request.receiver_id,
            odor_type: request.odor_type,
            intensity: request.intensity,
            duration: request.duration,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SendCommandResponse {
    pub message: &'static str,
    pub command_id: i64,
}

#[instrument(name = "SendCommand", skip_all)]
pub async fn send_command(
    State(state): State<ApiState>,
    body: Result<Json<SendCommandRequest>, JsonRejection>,
) -> Result<Json<SendCommandResponse>, ApiError> {
    let Json(request) = body?;

    let dispatched = state.command_service.dispatch(request.into()).await?;
    debug!(command_id = dispatched.command_id, topic = %dispatched.topic, "command accepted");

    Ok(Json(SendCommandResponse {
        message: "Command sent successfully",
        command_id: dispatched.command_id,
    }))
}

pub async fn command_history(
    State(state): State<ApiState>,
) -> Result<Json<Vec<Command>>, ApiError> {
    let commands = state.command_service.command_history().await?;
    Ok(Json(commands))
}
