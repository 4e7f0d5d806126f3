use anyhow::{Context, Result};
use async_trait::async_trait;
use rumqttc::{AsyncClient, QoS};
use tracing::instrument;

/// Outbound MQTT publish operations
///
/// Abstracts the client handle so publishers can be tested without a broker.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MqttPublisher: Send + Sync {
    /// Queue a QoS 1, non-retained publish on the client's event loop
    async fn publish(&self, topic: String, payload: Vec<u8>) -> Result<()>;
}

/// [`MqttPublisher`] backed by a rumqttc client handle.
///
/// The publish only leaves the process while the matching event loop is polled.
#[derive(Clone)]
pub struct RumqttcPublisher {
    client: AsyncClient,
}

impl RumqttcPublisher {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MqttPublisher for RumqttcPublisher {
    #[instrument(skip(self, payload), fields(topic = %topic, payload_size = payload.len()))]
    async fn publish(&self, topic: String, payload: Vec<u8>) -> Result<()> {
        self.client
            .publish(topic.as_str(), QoS::AtLeastOnce, false, payload)
            .await
            .with_context(|| format!("Failed to publish to {}", topic))
    }
}
