use crate::domain::{DeviceRegistry, LivenessSweep, LivenessSweepConfig, PresenceTracker};
use crate::mqtt::{run_mqtt_subscriber, MqttSubscriberConfig, PresenceConsumer, TopicRouter};
use common::domain::{DeviceLogRepository, DeviceRepository};
use rots_runner::{app_process, AppProcess};
use rumqttc::{AsyncClient, EventLoop};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

pub struct DevicePresenceConfig {
    pub channel_capacity: usize,
    pub subscriber: MqttSubscriberConfig,
    /// `None` disables offline detection
    pub liveness_sweep: Option<LivenessSweepConfig>,
}

/// Presence module: MQTT subscriber plus the single presence consumer
pub struct DevicePresence {
    client: AsyncClient,
    eventloop: EventLoop,
    tracker: Arc<PresenceTracker>,
    config: DevicePresenceConfig,
}

impl DevicePresence {
    pub fn new(
        client: AsyncClient,
        eventloop: EventLoop,
        registry: Arc<DeviceRegistry>,
        device_repository: Arc<dyn DeviceRepository>,
        log_repository: Arc<dyn DeviceLogRepository>,
        config: DevicePresenceConfig,
    ) -> Self {
        debug!("initializing device presence module");
        let tracker = Arc::new(PresenceTracker::new(
            registry,
            device_repository,
            log_repository,
        ));

        Self {
            client,
            eventloop,
            tracker,
            config,
        }
    }

    /// Subscriber and consumer processes, named for the runner
    pub fn into_runner_processes(self) -> Vec<(&'static str, AppProcess)> {
        let (sender, receiver) = mpsc::channel(self.config.channel_capacity);

        let liveness_sweep = self
            .config
            .liveness_sweep
            .map(|config| LivenessSweep::new(Arc::clone(&self.tracker), config));
        let consumer = PresenceConsumer::new(
            receiver,
            TopicRouter::new(Arc::clone(&self.tracker)),
            liveness_sweep,
        );

        let client = self.client;
        let eventloop = self.eventloop;
        let subscriber_config = self.config.subscriber;

        vec![
            (
                "mqtt_subscriber",
                app_process(move |ctx| {
                    run_mqtt_subscriber(client, eventloop, sender, subscriber_config, ctx)
                }),
            ),
            ("presence_consumer", app_process(move |ctx| consumer.run(ctx))),
        ]
    }
}
