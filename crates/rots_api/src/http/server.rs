use crate::domain::DeviceService;
use crate::http::command_handler::{command_history, send_command};
use crate::http::device_handler::{device_logs, device_presence, list_devices, register_device};
use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use command_dispatch::CommandDispatchService;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Services shared by every handler
#[derive(Clone)]
pub struct ApiState {
    pub device_service: Arc<DeviceService>,
    pub command_service: Arc<CommandDispatchService>,
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/devices", get(list_devices))
        .route("/api/devices/presence", get(device_presence))
        .route("/api/devices/register", post(register_device))
        .route("/api/devices/:device_id/logs", get(device_logs))
        .route("/api/commands/send", post(send_command))
        .route("/api/commands/history", get(command_history))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serve the API until `cancellation_token` fires
pub async fn run_http_server(
    config: HttpServerConfig,
    state: ApiState,
    cancellation_token: CancellationToken,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid server address {}:{}", config.host, config.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Starting HTTP server on {}", addr);

    let server = axum::serve(listener, build_router(state)).with_graceful_shutdown(async move {
        cancellation_token.cancelled().await;
        info!("HTTP server shutdown signal received");
    });

    match server.await {
        Ok(()) => {
            info!("HTTP server stopped gracefully");
            Ok(())
        }
        Err(e) => {
            error!("HTTP server error: {}", e);
            Err(e.into())
        }
    }
}
