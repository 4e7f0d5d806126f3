mod consumer;
mod router;
pub(crate) mod subscriber;
mod topic;

pub use consumer::PresenceConsumer;
pub use router::{RouteOutcome, TopicRouter};
pub use subscriber::{run_mqtt_subscriber, InboundMessage, MqttSubscriberConfig};
pub use topic::{parse_topic, subscription_topics, ParsedTopic, TopicKind};
