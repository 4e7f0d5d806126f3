use crate::domain::{encode, CommandPublisher, WireCommandPayload};
use common::domain::{
    Clock, Command, CommandRepository, CreateCommandRepoInput, DomainError, DomainResult,
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Rows returned by the command history read
pub const COMMAND_HISTORY_LIMIT: i64 = 100;

const MISSING_PARAMETERS: &str = "Missing required parameters";

/// Command request as received from a client. Every field is required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchCommandInput {
    pub sender_id: Option<String>,
    pub receiver_id: Option<String>,
    pub odor_type: Option<String>,
    pub intensity: Option<i64>,
    pub duration: Option<i64>,
}

/// Result of a successful dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedCommand {
    pub command_id: i64,
    pub topic: String,
    pub payload: WireCommandPayload,
}

/// Validates, records and publishes odor commands
pub struct CommandDispatchService {
    command_repository: Arc<dyn CommandRepository>,
    publisher: Arc<dyn CommandPublisher>,
    clock: Arc<dyn Clock>,
}

impl CommandDispatchService {
    pub fn new(
        command_repository: Arc<dyn CommandRepository>,
        publisher: Arc<dyn CommandPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            command_repository,
            publisher,
            clock,
        }
    }

    /// Record a command as pending, then publish it to its receiver.
    ///
    /// Nothing is published if the record cannot be written. If publishing
    /// fails the record stays pending and the error is returned.
    #[instrument(skip(self, input), fields(receiver_id = ?input.receiver_id))]
    pub async fn dispatch(&self, input: DispatchCommandInput) -> DomainResult<DispatchedCommand> {
        let repo_input = validate(input)?;
        debug!(
            sender_id = %repo_input.sender_id,
            odor_type = %repo_input.odor_type,
            intensity = repo_input.intensity,
            duration = repo_input.duration,
            "dispatching command"
        );

        let command = self
            .command_repository
            .create_command(repo_input)
            .await
            .inspect_err(|e| error!(error = %e, "failed to store command"))?;

        let payload = encode(
            &command.odor_type,
            command.intensity,
            command.duration,
            self.clock.now(),
        )?;

        let topic = self
            .publisher
            .publish_command(&command.receiver_id, &payload)
            .await
            .inspect_err(|e| {
                error!(command_id = command.id, error = %e, "command stored but not published")
            })?;

        info!(command_id = command.id, topic = %topic, "command sent");
        Ok(DispatchedCommand {
            command_id: command.id,
            topic,
            payload,
        })
    }

    /// Latest commands, newest first
    pub async fn command_history(&self) -> DomainResult<Vec<Command>> {
        self.command_repository
            .list_recent_commands(COMMAND_HISTORY_LIMIT)
            .await
    }
}

/// Every field must be present and non-empty; numeric zero counts as missing.
fn validate(input: DispatchCommandInput) -> DomainResult<CreateCommandRepoInput> {
    let missing = || DomainError::ValidationError(MISSING_PARAMETERS.to_string());

    let text = |value: Option<String>| value.filter(|v| !v.is_empty());
    let number = |value: Option<i64>| value.filter(|v| *v != 0);

    Ok(CreateCommandRepoInput {
        sender_id: text(input.sender_id).ok_or_else(missing)?,
        receiver_id: text(input.receiver_id).ok_or_else(missing)?,
        odor_type: text(input.odor_type).ok_or_else(missing)?,
        intensity: number(input.intensity).ok_or_else(missing)?,
        duration: number(input.duration).ok_or_else(missing)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{verify, MockCommandPublisher};
    use chrono::{TimeZone, Utc};
    use common::domain::{CommandStatus, ManualClock, MockCommandRepository};

    fn request(
        sender_id: &str,
        receiver_id: &str,
        odor_type: &str,
        intensity: i64,
        duration: i64,
    ) -> DispatchCommandInput {
        DispatchCommandInput {
            sender_id: Some(sender_id.to_string()),
            receiver_id: Some(receiver_id.to_string()),
            odor_type: Some(odor_type.to_string()),
            intensity: Some(intensity),
            duration: Some(duration),
        }
    }

    fn stored(id: i64, input: &CreateCommandRepoInput) -> Command {
        Command {
            id,
            sender_id: input.sender_id.clone(),
            receiver_id: input.receiver_id.clone(),
            odor_type: input.odor_type.clone(),
            intensity: input.intensity,
            duration: input.duration,
            status: CommandStatus::Pending,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            executed_at: None,
        }
    }

    fn create_service(
        repo: MockCommandRepository,
        publisher: MockCommandPublisher,
    ) -> CommandDispatchService {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        CommandDispatchService::new(Arc::new(repo), Arc::new(publisher), Arc::new(clock))
    }

    fn rejecting_mocks() -> (MockCommandRepository, MockCommandPublisher) {
        let mut repo = MockCommandRepository::new();
        repo.expect_create_command().times(0);
        let mut publisher = MockCommandPublisher::new();
        publisher.expect_publish_command().times(0);
        (repo, publisher)
    }

    #[tokio::test]
    async fn test_dispatch_success() {
        let mut repo = MockCommandRepository::new();
        repo.expect_create_command()
            .withf(|input: &CreateCommandRepoInput| {
                input.sender_id == "S1"
                    && input.receiver_id == "R1"
                    && input.odor_type == "mint"
                    && input.intensity == 70
                    && input.duration == 30
            })
            .times(1)
            .returning(|input| Ok(stored(42, &input)));

        let mut publisher = MockCommandPublisher::new();
        publisher
            .expect_publish_command()
            .withf(|receiver_id: &str, payload: &WireCommandPayload| {
                receiver_id == "R1" && payload.odor_type == 4 && verify(payload).is_ok()
            })
            .times(1)
            .returning(|receiver_id, _| Ok(format!("rots/command/{}", receiver_id)));

        let service = create_service(repo, publisher);
        let dispatched = service
            .dispatch(request("S1", "R1", "mint", 70, 30))
            .await
            .unwrap();

        assert_eq!(dispatched.command_id, 42);
        assert_eq!(dispatched.topic, "rots/command/R1");
        assert_eq!(dispatched.payload.intensity, 70);
        assert_eq!(dispatched.payload.duration, 30);
        assert_eq!(dispatched.payload.timestamp, 1_714_564_800_000);
    }

    #[tokio::test]
    async fn test_dispatch_stores_unclamped_values() {
        let mut repo = MockCommandRepository::new();
        repo.expect_create_command()
            .withf(|input: &CreateCommandRepoInput| input.intensity == 150 && input.duration == 400)
            .times(1)
            .returning(|input| Ok(stored(7, &input)));

        let mut publisher = MockCommandPublisher::new();
        publisher
            .expect_publish_command()
            .withf(|_: &str, payload: &WireCommandPayload| {
                payload.intensity == 100 && payload.duration == 300
            })
            .times(1)
            .returning(|receiver_id, _| Ok(format!("rots/command/{}", receiver_id)));

        let service = create_service(repo, publisher);
        let dispatched = service
            .dispatch(request("S1", "R1", "lemon", 150, 400))
            .await
            .unwrap();
        assert_eq!(dispatched.command_id, 7);
    }

    #[tokio::test]
    async fn test_dispatch_rejects_empty_sender() {
        let (repo, publisher) = rejecting_mocks();
        let service = create_service(repo, publisher);

        let result = service.dispatch(request("", "R1", "mint", 70, 30)).await;
        match result {
            Err(DomainError::ValidationError(message)) => {
                assert_eq!(message, "Missing required parameters")
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_rejects_zero_intensity() {
        let (repo, publisher) = rejecting_mocks();
        let service = create_service(repo, publisher);

        let result = service.dispatch(request("S1", "R1", "mint", 0, 30)).await;
        assert!(matches!(result, Err(DomainError::ValidationError(_))));

        let result = service.dispatch(request("S1", "R1", "mint", 70, 0)).await;
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_dispatch_rejects_absent_fields() {
        let (repo, publisher) = rejecting_mocks();
        let service = create_service(repo, publisher);

        let mut input = request("S1", "R1", "mint", 70, 30);
        input.odor_type = None;
        assert!(matches!(
            service.dispatch(input).await,
            Err(DomainError::ValidationError(_))
        ));

        assert!(matches!(
            service.dispatch(DispatchCommandInput::default()).await,
            Err(DomainError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_dispatch_accepts_negative_intensity() {
        let mut repo = MockCommandRepository::new();
        repo.expect_create_command()
            .times(1)
            .returning(|input| Ok(stored(3, &input)));
        let mut publisher = MockCommandPublisher::new();
        publisher
            .expect_publish_command()
            .withf(|_: &str, payload: &WireCommandPayload| payload.intensity == 0)
            .times(1)
            .returning(|receiver_id, _| Ok(format!("rots/command/{}", receiver_id)));

        let service = create_service(repo, publisher);
        assert!(service
            .dispatch(request("S1", "R1", "mint", -5, 30))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_store_failure_skips_publish() {
        let mut repo = MockCommandRepository::new();
        repo.expect_create_command()
            .times(1)
            .returning(|_| Err(DomainError::RepositoryError(anyhow::anyhow!("db down"))));
        let mut publisher = MockCommandPublisher::new();
        publisher.expect_publish_command().times(0);

        let service = create_service(repo, publisher);
        let result = service.dispatch(request("S1", "R1", "mint", 70, 30)).await;
        assert!(matches!(result, Err(DomainError::RepositoryError(_))));
    }

    #[tokio::test]
    async fn test_dispatch_surfaces_publish_failure() {
        let mut repo = MockCommandRepository::new();
        repo.expect_create_command()
            .times(1)
            .returning(|input| Ok(stored(9, &input)));
        let mut publisher = MockCommandPublisher::new();
        publisher
            .expect_publish_command()
            .times(1)
            .returning(|_, _| Err(DomainError::PublishError("broker unreachable".to_string())));

        let service = create_service(repo, publisher);
        let result = service.dispatch(request("S1", "R1", "mint", 70, 30)).await;
        assert!(matches!(result, Err(DomainError::PublishError(_))));
    }

    #[tokio::test]
    async fn test_command_history_uses_limit() {
        let mut repo = MockCommandRepository::new();
        repo.expect_list_recent_commands()
            .withf(|limit: &i64| *limit == COMMAND_HISTORY_LIMIT)
            .times(1)
            .returning(|_| Ok(vec![]));
        let publisher = MockCommandPublisher::new();

        let service = create_service(repo, publisher);
        assert!(service.command_history().await.unwrap().is_empty());
    }
}
