use crate::domain::{DomainError, DomainResult};
use rumqttc::{AsyncClient, EventLoop, MqttOptions};
use std::time::Duration;
use tracing::info;

const DEFAULT_MQTT_PORT: u16 = 1883;

/// Broker connection settings
#[derive(Debug, Clone)]
pub struct MqttConnectionConfig {
    pub broker_url: String,
    pub client_id: String,
    pub keep_alive: Duration,
    /// Capacity of the client request channel
    pub request_capacity: usize,
}

/// Creates the shared client handle and its event loop.
///
/// Nothing is sent on the wire until the event loop is polled.
pub fn connect(config: &MqttConnectionConfig) -> DomainResult<(AsyncClient, EventLoop)> {
    let (host, port) = parse_broker_url(&config.broker_url)?;

    let mut mqtt_options = MqttOptions::new(&config.client_id, host, port);
    mqtt_options.set_keep_alive(config.keep_alive);
    mqtt_options.set_clean_session(true);

    info!(
        broker_url = %config.broker_url,
        client_id = %config.client_id,
        "created MQTT client"
    );

    Ok(AsyncClient::new(mqtt_options, config.request_capacity))
}

/// Parse broker URL in format mqtt://host:port, tcp://host:port or host:port
pub fn parse_broker_url(url: &str) -> DomainResult<(&str, u16)> {
    let url = url.trim_start_matches("mqtt://");
    let url = url.trim_start_matches("tcp://");

    let parts: Vec<&str> = url.split(':').collect();
    match parts.as_slice() {
        [host] if !host.is_empty() => Ok((*host, DEFAULT_MQTT_PORT)),
        [host, port] if !host.is_empty() => {
            let port = port.parse::<u16>().map_err(|_| {
                DomainError::InvalidBrokerConfig(format!("Invalid port in broker URL: {}", port))
            })?;
            Ok((*host, port))
        }
        _ => Err(DomainError::InvalidBrokerConfig(format!(
            "Invalid broker URL format: {}",
            url
        ))),
    }
}
