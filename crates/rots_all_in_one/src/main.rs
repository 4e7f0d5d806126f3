mod config;

use command_dispatch::{CommandDispatchService, CommandPublisherConfig, MqttCommandPublisher};
use common::domain::{Clock, SystemClock};
use common::mqtt::{connect, MqttConnectionConfig, RumqttcPublisher};
use common::postgres::{
    ensure_schema, PostgresClient, PostgresCommandRepository, PostgresConfig,
    PostgresDeviceLogRepository, PostgresDeviceRepository,
};
use common::telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig, TelemetryProviders};
use config::ServiceConfig;
use device_presence::domain::{DeviceRegistry, LivenessSweepConfig};
use device_presence::mqtt::MqttSubscriberConfig;
use device_presence::{DevicePresence, DevicePresenceConfig};
use rots_api::domain::DeviceService;
use rots_api::http::{ApiState, HttpServerConfig};
use rots_api::RotsApi;
use rots_runner::Runner;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let telemetry_providers: Option<TelemetryProviders> = match init_telemetry(&TelemetryConfig {
        service_name: config.otel_service_name.clone(),
        otel_endpoint: config.otel_endpoint.clone(),
        otel_enabled: config.otel_enabled,
        log_level: config.log_level.clone(),
    }) {
        Ok(providers) => providers,
        Err(e) => {
            eprintln!("Failed to initialize telemetry: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        otel_enabled = config.otel_enabled,
        mqtt_url = %config.mqtt_url,
        "Starting rots-all-in-one service"
    );
    debug!("Configuration: {:?}", config);

    let repositories = match initialize_postgres(&config).await {
        Ok(repos) => repos,
        Err(e) => {
            error!("Failed to initialize PostgreSQL: {:#}", e);
            std::process::exit(1);
        }
    };

    let (mqtt_client, mqtt_eventloop) = match connect(&MqttConnectionConfig {
        broker_url: config.mqtt_url.clone(),
        client_id: config.mqtt_client_id.clone(),
        keep_alive: Duration::from_secs(config.mqtt_keep_alive_secs),
        request_capacity: config.mqtt_channel_capacity,
    }) {
        Ok(handles) => handles,
        Err(e) => {
            error!("Failed to configure MQTT client: {}", e);
            std::process::exit(1);
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let registry = Arc::new(DeviceRegistry::new(Arc::clone(&clock)));

    let command_publisher = MqttCommandPublisher::new(
        Arc::new(RumqttcPublisher::new(mqtt_client.clone())),
        CommandPublisherConfig {
            max_attempts: config.publish_max_attempts,
            retry_delay: Duration::from_millis(config.publish_retry_delay_ms),
        },
    );
    let command_service = Arc::new(CommandDispatchService::new(
        repositories.command.clone(),
        Arc::new(command_publisher),
        clock,
    ));
    let device_service = Arc::new(DeviceService::new(
        repositories.device.clone(),
        repositories.log.clone(),
        Arc::clone(&registry),
    ));

    let device_presence = DevicePresence::new(
        mqtt_client,
        mqtt_eventloop,
        registry,
        repositories.device.clone(),
        repositories.log.clone(),
        DevicePresenceConfig {
            channel_capacity: config.mqtt_channel_capacity,
            subscriber: MqttSubscriberConfig {
                max_retry_attempts: config.mqtt_max_retry_attempts,
                retry_delay: Duration::from_millis(config.mqtt_retry_delay_ms),
            },
            liveness_sweep: config.liveness_sweep_enabled.then(|| LivenessSweepConfig {
                deadline_secs: config.liveness_deadline_secs,
                interval: Duration::from_secs(config.liveness_sweep_interval_secs),
            }),
        },
    );

    let rots_api = RotsApi::new(
        ApiState {
            device_service,
            command_service,
        },
        HttpServerConfig {
            host: config.http_host.clone(),
            port: config.http_port,
        },
    );

    let mut runner = Runner::new().with_boxed_process("rots_api", rots_api.into_runner_process());
    for (name, process) in device_presence.into_runner_processes() {
        runner = runner.with_boxed_process(name, process);
    }

    let result = runner
        .with_closer(move || async move {
            info!("Running cleanup tasks...");
            shutdown_telemetry(telemetry_providers);
            Ok(())
        })
        .with_closer_timeout(Duration::from_secs(10))
        .run()
        .await;

    if let Err(e) = result {
        eprintln!("rots-all-in-one stopped with error: {:#}", e);
        std::process::exit(1);
    }
}

struct PostgresRepositories {
    device: Arc<PostgresDeviceRepository>,
    command: Arc<PostgresCommandRepository>,
    log: Arc<PostgresDeviceLogRepository>,
}

async fn initialize_postgres(config: &ServiceConfig) -> anyhow::Result<PostgresRepositories> {
    info!("Initializing PostgreSQL...");
    let client = PostgresClient::new(&PostgresConfig {
        host: config.postgres_host.clone(),
        port: config.postgres_port,
        database: config.postgres_database.clone(),
        username: config.postgres_username.clone(),
        password: config.postgres_password.clone(),
        max_pool_size: config.postgres_max_connections,
    })?;
    client.ping().await?;
    ensure_schema(&client).await?;

    Ok(PostgresRepositories {
        device: Arc::new(PostgresDeviceRepository::new(client.clone())),
        command: Arc::new(PostgresCommandRepository::new(client.clone())),
        log: Arc::new(PostgresDeviceLogRepository::new(client)),
    })
}
