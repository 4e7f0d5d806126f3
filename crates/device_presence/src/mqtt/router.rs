use crate::domain::{ErrorReport, PresenceTracker, TrackedDevice};
use crate::mqtt::topic::{parse_topic, TopicKind};
use common::domain::{DomainError, DomainResult};
use serde_json::{Map, Value};
use std::sync::Arc;

/// What a routed message did
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Status(TrackedDevice),
    Error(TrackedDevice),
    /// `None` when the heartbeat came from a device the registry does not know
    Heartbeat(Option<TrackedDevice>),
    Ignored { kind: String },
}

/// Demultiplexes inbound bus messages onto the presence handlers
pub struct TopicRouter {
    tracker: Arc<PresenceTracker>,
}

impl TopicRouter {
    pub fn new(tracker: Arc<PresenceTracker>) -> Self {
        Self { tracker }
    }

    pub async fn route(&self, topic: &str, payload: &[u8]) -> DomainResult<RouteOutcome> {
        let parsed = parse_topic(topic)?;

        match parsed.kind {
            TopicKind::Status => {
                let fields = parse_object(payload)?;
                let device = self.tracker.handle_status(&parsed.device_id, fields).await;
                Ok(RouteOutcome::Status(device))
            }
            TopicKind::Error => {
                let fields = parse_object(payload)?;
                let report = ErrorReport {
                    message: fields.get("message").map(|message| match message {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    }),
                };
                let device = self.tracker.handle_error(&parsed.device_id, report).await;
                Ok(RouteOutcome::Error(device))
            }
            // Heartbeat payloads carry nothing we use
            TopicKind::Heartbeat => {
                let device = self.tracker.handle_heartbeat(&parsed.device_id).await;
                Ok(RouteOutcome::Heartbeat(device))
            }
            TopicKind::Other(kind) => Ok(RouteOutcome::Ignored { kind }),
        }
    }
}

fn parse_object(payload: &[u8]) -> DomainResult<Map<String, Value>> {
    match serde_json::from_slice::<Value>(payload) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(DomainError::MalformedMessage(format!(
            "expected a JSON object, got {}",
            other
        ))),
        Err(e) => Err(DomainError::MalformedMessage(e.to_string())),
    }
}
