use crate::domain::LivenessSweep;
use crate::mqtt::router::{RouteOutcome, TopicRouter};
use crate::mqtt::subscriber::InboundMessage;
use common::domain::DomainError;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

/// Single writer for presence state.
///
/// Inbound messages and liveness sweeps are handled one at a time on this task,
/// so events for the same device are applied in arrival order.
pub struct PresenceConsumer {
    receiver: mpsc::Receiver<InboundMessage>,
    router: TopicRouter,
    liveness_sweep: Option<LivenessSweep>,
}

impl PresenceConsumer {
    pub fn new(
        receiver: mpsc::Receiver<InboundMessage>,
        router: TopicRouter,
        liveness_sweep: Option<LivenessSweep>,
    ) -> Self {
        Self {
            receiver,
            router,
            liveness_sweep,
        }
    }

    pub async fn run(mut self, ctx: CancellationToken) -> anyhow::Result<()> {
        info!(
            liveness_sweep = self.liveness_sweep.is_some(),
            "starting presence consumer"
        );

        let mut ticker = self.liveness_sweep.as_ref().map(|sweep| {
            let mut ticker = tokio::time::interval(sweep.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });

        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    debug!("presence consumer cancelled");
                    break;
                }
                message = self.receiver.recv() => {
                    match message {
                        Some(message) => self.handle_message(message).await,
                        None => {
                            debug!("inbound channel closed");
                            break;
                        }
                    }
                }
                _ = next_tick(&mut ticker) => {
                    if let Some(sweep) = &self.liveness_sweep {
                        let expired = sweep.sweep_once().await;
                        if !expired.is_empty() {
                            info!(count = expired.len(), "liveness sweep marked devices offline");
                        }
                    }
                }
            }
        }

        info!("presence consumer stopped");
        Ok(())
    }

    /// Route one message in its own trace. Bad messages are logged and dropped.
    pub async fn handle_message(&self, message: InboundMessage) {
        let span = info_span!(
            parent: Span::none(),
            "presence_message",
            topic = %message.topic,
            payload_size = message.payload.len(),
        );

        async {
            match self.router.route(&message.topic, &message.payload).await {
                Ok(RouteOutcome::Ignored { kind }) => {
                    debug!(kind = %kind, "ignoring message of unhandled kind");
                }
                Ok(outcome) => {
                    debug!(?outcome, "presence message applied");
                }
                Err(e @ (DomainError::MalformedMessage(_) | DomainError::InvalidTopic(_))) => {
                    warn!(error = %e, "dropping malformed presence message");
                }
                Err(e) => {
                    error!(error = %e, "failed to handle presence message");
                }
            }
        }
        .instrument(span)
        .await
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
