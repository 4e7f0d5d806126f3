use common::domain::{DomainError, DomainResult};
use common::mqtt::TOPIC_ROOT;

/// Event kind carried in the second topic segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicKind {
    Status,
    Error,
    Heartbeat,
    Other(String),
}

impl TopicKind {
    fn from_segment(segment: &str) -> Self {
        match segment {
            "status" => TopicKind::Status,
            "error" => TopicKind::Error,
            "heartbeat" => TopicKind::Heartbeat,
            other => TopicKind::Other(other.to_string()),
        }
    }
}

/// Parsed presence topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTopic {
    pub kind: TopicKind,
    pub device_id: String,
}

/// Parse a topic in the format `rots/{kind}/{device_id}`.
///
/// The kind is the second segment and the device id the last one.
///
/// # Examples
/// ```
/// use device_presence::mqtt::{parse_topic, TopicKind};
///
/// let parsed = parse_topic("rots/status/S1").unwrap();
/// assert_eq!(parsed.kind, TopicKind::Status);
/// assert_eq!(parsed.device_id, "S1");
/// ```
pub fn parse_topic(topic: &str) -> DomainResult<ParsedTopic> {
    let parts: Vec<&str> = topic.split('/').collect();

    if parts.len() < 3 {
        return Err(DomainError::InvalidTopic(format!(
            "Invalid topic format '{}': expected '{}/{{kind}}/{{device_id}}'",
            topic, TOPIC_ROOT
        )));
    }

    if parts[0] != TOPIC_ROOT {
        return Err(DomainError::InvalidTopic(format!(
            "Unexpected topic root in '{}'",
            topic
        )));
    }

    let device_id = parts[parts.len() - 1].trim();
    if device_id.is_empty() {
        return Err(DomainError::InvalidTopic(format!(
            "Device ID cannot be empty in topic '{}'",
            topic
        )));
    }

    Ok(ParsedTopic {
        kind: TopicKind::from_segment(parts[1]),
        device_id: device_id.to_string(),
    })
}

/// Topic filters the presence subscriber listens on
pub fn subscription_topics() -> Vec<String> {
    ["status", "error", "heartbeat"]
        .iter()
        .map(|kind| format!("{}/{}/+", TOPIC_ROOT, kind))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_topic() {
        let parsed = parse_topic("rots/status/S1").unwrap();
        assert_eq!(parsed.kind, TopicKind::Status);
        assert_eq!(parsed.device_id, "S1");
    }

    #[test]
    fn test_parse_error_and_heartbeat_topics() {
        assert_eq!(parse_topic("rots/error/R1").unwrap().kind, TopicKind::Error);
        assert_eq!(
            parse_topic("rots/heartbeat/001").unwrap().kind,
            TopicKind::Heartbeat
        );
    }

    #[test]
    fn test_parse_unknown_kind() {
        let parsed = parse_topic("rots/detection/001").unwrap();
        assert_eq!(parsed.kind, TopicKind::Other("detection".to_string()));
    }

    #[test]
    fn test_device_id_is_last_segment() {
        let parsed = parse_topic("rots/status/lab/S7").unwrap();
        assert_eq!(parsed.kind, TopicKind::Status);
        assert_eq!(parsed.device_id, "S7");
    }

    #[test]
    fn test_parse_topic_too_few_segments() {
        assert!(parse_topic("rots/status").is_err());
        assert!(parse_topic("rots").is_err());
        assert!(parse_topic("").is_err());
    }

    #[test]
    fn test_parse_topic_wrong_root() {
        let result = parse_topic("other/status/S1");
        assert!(matches!(result, Err(DomainError::InvalidTopic(_))));
    }

    #[test]
    fn test_parse_topic_empty_device() {
        assert!(parse_topic("rots/status/").is_err());
    }

    #[test]
    fn test_subscription_topics() {
        assert_eq!(
            subscription_topics(),
            vec!["rots/status/+", "rots/error/+", "rots/heartbeat/+"]
        );
    }
}
