use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

/// Service settings, read once at startup from `ROTS_*` environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // MQTT configuration
    /// Broker URL, mqtt://host:port
    #[serde(default = "default_mqtt_url")]
    pub mqtt_url: String,

    #[serde(default = "default_mqtt_client_id")]
    pub mqtt_client_id: String,

    #[serde(default = "default_mqtt_keep_alive_secs")]
    pub mqtt_keep_alive_secs: u64,

    /// Consecutive event loop failures tolerated before the subscriber gives up
    #[serde(default = "default_mqtt_max_retry_attempts")]
    pub mqtt_max_retry_attempts: u32,

    #[serde(default = "default_mqtt_retry_delay_ms")]
    pub mqtt_retry_delay_ms: u64,

    /// Capacity of the inbound presence channel and the client request queue
    #[serde(default = "default_mqtt_channel_capacity")]
    pub mqtt_channel_capacity: usize,

    /// Attempts per command publish, including the first
    #[serde(default = "default_publish_max_attempts")]
    pub publish_max_attempts: u32,

    #[serde(default = "default_publish_retry_delay_ms")]
    pub publish_retry_delay_ms: u64,

    // PostgreSQL configuration
    #[serde(default = "default_postgres_host")]
    pub postgres_host: String,

    #[serde(default = "default_postgres_port")]
    pub postgres_port: u16,

    #[serde(default = "default_postgres_database")]
    pub postgres_database: String,

    #[serde(default = "default_postgres_username")]
    pub postgres_username: String,

    #[serde(default = "default_postgres_password")]
    pub postgres_password: String,

    #[serde(default = "default_postgres_max_connections")]
    pub postgres_max_connections: usize,

    // HTTP configuration
    #[serde(default = "default_http_host")]
    pub http_host: String,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    // Liveness sweep
    /// Mark silent devices offline
    #[serde(default = "default_liveness_sweep_enabled")]
    pub liveness_sweep_enabled: bool,

    /// Silence after which a device is considered offline
    #[serde(default = "default_liveness_deadline_secs")]
    pub liveness_deadline_secs: u64,

    #[serde(default = "default_liveness_sweep_interval_secs")]
    pub liveness_sweep_interval_secs: u64,

    // OpenTelemetry configuration
    #[serde(default = "default_otel_enabled")]
    pub otel_enabled: bool,

    /// OTLP gRPC endpoint
    #[serde(default = "default_otel_endpoint")]
    pub otel_endpoint: String,

    #[serde(default = "default_otel_service_name")]
    pub otel_service_name: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_mqtt_url() -> String {
    "mqtt://localhost:1883".to_string()
}

fn default_mqtt_client_id() -> String {
    "rots-cloud-server".to_string()
}

fn default_mqtt_keep_alive_secs() -> u64 {
    30
}

fn default_mqtt_max_retry_attempts() -> u32 {
    10
}

fn default_mqtt_retry_delay_ms() -> u64 {
    2000
}

fn default_mqtt_channel_capacity() -> usize {
    1024
}

fn default_publish_max_attempts() -> u32 {
    3
}

fn default_publish_retry_delay_ms() -> u64 {
    500
}

fn default_postgres_host() -> String {
    "localhost".to_string()
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_postgres_database() -> String {
    "rots_db".to_string()
}

fn default_postgres_username() -> String {
    "rots".to_string()
}

fn default_postgres_password() -> String {
    "rots".to_string()
}

fn default_postgres_max_connections() -> usize {
    10
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    3000
}

fn default_liveness_sweep_enabled() -> bool {
    true
}

fn default_liveness_deadline_secs() -> u64 {
    90
}

fn default_liveness_sweep_interval_secs() -> u64 {
    15
}

fn default_otel_enabled() -> bool {
    false
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_otel_service_name() -> String {
    "rots-all-in-one".to_string()
}

/// Longest accepted liveness deadline (one week)
const MAX_LIVENESS_DEADLINE_SECS: u64 = 7 * 24 * 60 * 60;

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: Self = Config::builder()
            .add_source(Environment::with_prefix("ROTS"))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the runtime cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt_channel_capacity == 0 {
            return Err(invalid("mqtt_channel_capacity must be greater than 0"));
        }
        if self.publish_max_attempts == 0 {
            return Err(invalid("publish_max_attempts must be greater than 0"));
        }
        if self.postgres_max_connections == 0 {
            return Err(invalid("postgres_max_connections must be greater than 0"));
        }
        if self.liveness_sweep_enabled {
            if self.liveness_sweep_interval_secs == 0 {
                return Err(invalid("liveness_sweep_interval_secs must be greater than 0"));
            }
            if !(1..=MAX_LIVENESS_DEADLINE_SECS).contains(&self.liveness_deadline_secs) {
                return Err(ConfigError::Message(format!(
                    "liveness_deadline_secs must be between 1 and {}",
                    MAX_LIVENESS_DEADLINE_SECS
                )));
            }
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Message(message.to_string())
}
