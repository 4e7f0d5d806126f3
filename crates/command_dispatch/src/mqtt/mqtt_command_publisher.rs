use crate::domain::{CommandPublisher, WireCommandPayload};
use async_trait::async_trait;
use common::domain::{DomainError, DomainResult};
use common::mqtt::{MqttPublisher, TOPIC_ROOT};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone)]
pub struct CommandPublisherConfig {
    /// Total publish attempts, including the first
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for CommandPublisherConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Topic commands for `receiver_id` are published on
pub fn command_topic(receiver_id: &str) -> String {
    format!("{}/command/{}", TOPIC_ROOT, receiver_id)
}

/// Publishes command payloads over MQTT with bounded retry
pub struct MqttCommandPublisher {
    publisher: Arc<dyn MqttPublisher>,
    config: CommandPublisherConfig,
}

impl MqttCommandPublisher {
    pub fn new(publisher: Arc<dyn MqttPublisher>, config: CommandPublisherConfig) -> Self {
        debug!(
            max_attempts = config.max_attempts,
            retry_delay_ms = config.retry_delay.as_millis() as u64,
            "initialized MQTT command publisher"
        );
        Self { publisher, config }
    }
}

#[async_trait]
impl CommandPublisher for MqttCommandPublisher {
    #[instrument(skip(self, payload), fields(receiver_id = %receiver_id))]
    async fn publish_command(
        &self,
        receiver_id: &str,
        payload: &WireCommandPayload,
    ) -> DomainResult<String> {
        let topic = command_topic(receiver_id);
        let body = payload.to_json()?;
        let max_attempts = self.config.max_attempts.max(1);

        let mut attempt = 1;
        loop {
            match self.publisher.publish(topic.clone(), body.clone()).await {
                Ok(()) => {
                    debug!(topic = %topic, attempt, "command published");
                    return Ok(topic);
                }
                Err(e) if attempt < max_attempts => {
                    warn!(topic = %topic, attempt, max_attempts, error = %e, "publish failed, retrying");
                    tokio::time::sleep(self.config.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(DomainError::PublishError(format!(
                        "failed to publish to {} after {} attempts: {}",
                        topic, attempt, e
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{encode, verify};
    use chrono::{TimeZone, Utc};
    use common::mqtt::MockMqttPublisher;
    use mockall::Sequence;

    fn payload() -> WireCommandPayload {
        encode(
            "mint",
            70,
            30,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn fast_config(max_attempts: u32) -> CommandPublisherConfig {
        CommandPublisherConfig {
            max_attempts,
            retry_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_command_topic() {
        assert_eq!(command_topic("R1"), "rots/command/R1");
    }

    #[tokio::test]
    async fn test_publish_sends_payload_json_to_receiver_topic() {
        let mut mqtt = MockMqttPublisher::new();
        mqtt.expect_publish()
            .withf(|topic: &String, body: &Vec<u8>| {
                let decoded = WireCommandPayload::from_json(body).unwrap();
                topic == "rots/command/R1" && decoded.odor_type == 4 && verify(&decoded).is_ok()
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let publisher = MqttCommandPublisher::new(Arc::new(mqtt), fast_config(3));
        let topic = publisher.publish_command("R1", &payload()).await.unwrap();
        assert_eq!(topic, "rots/command/R1");
    }

    #[tokio::test]
    async fn test_publish_retries_transient_failures() {
        let mut mqtt = MockMqttPublisher::new();
        let mut seq = Sequence::new();
        mqtt.expect_publish()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(anyhow::anyhow!("request channel full")));
        mqtt.expect_publish()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let publisher = MqttCommandPublisher::new(Arc::new(mqtt), fast_config(3));
        assert!(publisher.publish_command("R1", &payload()).await.is_ok());
    }

    #[tokio::test]
    async fn test_publish_gives_up_after_max_attempts() {
        let mut mqtt = MockMqttPublisher::new();
        mqtt.expect_publish()
            .times(3)
            .returning(|_, _| Err(anyhow::anyhow!("client closed")));

        let publisher = MqttCommandPublisher::new(Arc::new(mqtt), fast_config(3));
        let result = publisher.publish_command("R1", &payload()).await;

        match result {
            Err(DomainError::PublishError(message)) => {
                assert!(message.contains("rots/command/R1"));
                assert!(message.contains("3 attempts"));
            }
            other => panic!("expected publish error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_zero_attempts_still_publishes_once() {
        let mut mqtt = MockMqttPublisher::new();
        mqtt.expect_publish().times(1).returning(|_, _| Ok(()));

        let publisher = MqttCommandPublisher::new(Arc::new(mqtt), fast_config(0));
        assert!(publisher.publish_command("R9", &payload()).await.is_ok());
    }
}
