use crate::mqtt::topic::subscription_topics;
use anyhow::anyhow;
use rumqttc::{AsyncClient, Event, EventLoop, Packet, Publish, QoS};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// A publish received from the broker, queued for the presence consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct MqttSubscriberConfig {
    /// Consecutive event loop failures tolerated before giving up
    pub max_retry_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for MqttSubscriberConfig {
    fn default() -> Self {
        Self {
            max_retry_attempts: 10,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Drive the MQTT event loop and forward presence publishes into `sender`.
///
/// Subscriptions are (re)issued on every ConnAck since sessions are clean.
/// Polling the loop also flushes outbound publishes made through clones of
/// `client`, so this task must run for commands to leave the process.
#[instrument(name = "mqtt_subscriber", skip_all)]
pub async fn run_mqtt_subscriber(
    client: AsyncClient,
    mut eventloop: EventLoop,
    sender: mpsc::Sender<InboundMessage>,
    config: MqttSubscriberConfig,
    ctx: CancellationToken,
) -> anyhow::Result<()> {
    info!("starting MQTT subscriber");
    let mut retry_count = 0;

    loop {
        tokio::select! {
            _ = ctx.cancelled() => {
                debug!("shutdown signal received");
                request_disconnect(&client);
                break;
            }
            event = eventloop.poll() => {
                match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("connected to MQTT broker");
                        retry_count = 0;
                        subscribe_presence_topics(&client).await?;
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        if !forward_publish(&sender, publish).await {
                            return Err(anyhow!("presence consumer stopped receiving messages"));
                        }
                    }
                    Ok(Event::Incoming(Packet::SubAck(_))) => {
                        debug!("subscription acknowledged");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        retry_count += 1;
                        error!(error = %e, attempt = retry_count, "MQTT event loop error");

                        if retry_count >= config.max_retry_attempts {
                            return Err(anyhow!(
                                "MQTT connection failed after {} attempts: {}",
                                retry_count,
                                e
                            ));
                        }

                        warn!(
                            attempt = retry_count,
                            max_attempts = config.max_retry_attempts,
                            "retrying MQTT connection"
                        );

                        // The next poll reconnects
                        tokio::select! {
                            _ = ctx.cancelled() => {
                                request_disconnect(&client);
                                break;
                            }
                            _ = tokio::time::sleep(config.retry_delay) => {}
                        }
                    }
                }
            }
        }
    }

    info!("MQTT subscriber stopped");
    Ok(())
}

/// Queue a DISCONNECT without waiting. The event loop is no longer polled at
/// shutdown, so a full request queue must not block here.
fn request_disconnect(client: &AsyncClient) -> bool {
    match client.try_disconnect() {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "could not queue MQTT disconnect");
            false
        }
    }
}

async fn subscribe_presence_topics(client: &AsyncClient) -> anyhow::Result<()> {
    for topic in subscription_topics() {
        client
            .subscribe(&topic, QoS::AtLeastOnce)
            .await
            .map_err(|e| anyhow!("failed to subscribe to {}: {}", topic, e))?;
        info!(topic = %topic, "subscribed to MQTT topic");
    }
    Ok(())
}

/// Queue a publish for the consumer. Returns false once the consumer is gone.
pub(crate) async fn forward_publish(sender: &mpsc::Sender<InboundMessage>, publish: Publish) -> bool {
    let message = InboundMessage {
        topic: publish.topic,
        payload: publish.payload.to_vec(),
    };

    if let Err(e) = sender.send(message).await {
        error!(error = %e, "failed to queue inbound message");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forward_publish_queues_message() {
        let (sender, mut receiver) = mpsc::channel(4);
        let publish = Publish::new("rots/status/S1", QoS::AtLeastOnce, br#"{"ok":true}"#.to_vec());

        assert!(forward_publish(&sender, publish).await);

        let message = receiver.recv().await.unwrap();
        assert_eq!(message.topic, "rots/status/S1");
        assert_eq!(message.payload, br#"{"ok":true}"#.to_vec());
    }

    #[tokio::test]
    async fn test_forward_publish_detects_closed_consumer() {
        let (sender, receiver) = mpsc::channel(4);
        drop(receiver);

        let publish = Publish::new("rots/heartbeat/S1", QoS::AtLeastOnce, Vec::new());
        assert!(!forward_publish(&sender, publish).await);
    }

    #[test]
    fn test_disconnect_with_full_request_queue_returns() {
        let options = rumqttc::MqttOptions::new("rots-test", "127.0.0.1", 1883);
        let (client, _eventloop) = AsyncClient::new(options, 1);

        client
            .try_publish("rots/command/R1", QoS::AtLeastOnce, false, Vec::new())
            .unwrap();
        assert!(client
            .try_publish("rots/command/R1", QoS::AtLeastOnce, false, Vec::new())
            .is_err());

        assert!(!request_disconnect(&client));
    }

    #[test]
    fn test_disconnect_is_queued_when_there_is_room() {
        let options = rumqttc::MqttOptions::new("rots-test", "127.0.0.1", 1883);
        let (client, _eventloop) = AsyncClient::new(options, 4);

        assert!(request_disconnect(&client));
    }

    #[test]
    fn test_default_config() {
        let config = MqttSubscriberConfig::default();
        assert_eq!(config.max_retry_attempts, 10);
        assert_eq!(config.retry_delay, Duration::from_secs(2));
    }
}
