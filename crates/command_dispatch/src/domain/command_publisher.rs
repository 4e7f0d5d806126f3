use crate::domain::WireCommandPayload;
use async_trait::async_trait;
use common::domain::DomainResult;

/// Delivers encoded commands to receivers.
///
/// Implementations address the payload to `receiver_id` and return
/// `PublishError` once they give up.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommandPublisher: Send + Sync {
    /// Publish `payload` to the receiver, returning the topic used
    async fn publish_command(
        &self,
        receiver_id: &str,
        payload: &WireCommandPayload,
    ) -> DomainResult<String>;
}
