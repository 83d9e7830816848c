use chainwatch_domain::model::{
    ConfirmationPolicy, IgnoreReason, MalformedEventError, NotificationKind, NotificationState,
    WebhookEvent,
};
use metrics::{counter, histogram};
use tracing::{debug, info, warn};

use crate::classifier::classify;
use crate::dispatcher::{DispatchOutcome, DispatchReport, NotificationDispatcher};
use crate::extractor::extract_addresses;

/// Terminal result of handling one webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Ignored(IgnoreReason),
    Malformed(MalformedEventError),
    NoSubscribers,
    Dispatched {
        kind: NotificationKind,
        report: DispatchReport,
    },
}

impl ProcessOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Ignored(IgnoreReason::EmptyPing) => "empty_ping",
            Self::Ignored(IgnoreReason::Unconfirmed) => "unconfirmed",
            Self::Ignored(IgnoreReason::DuplicateRetry) => "duplicate_retry",
            Self::Malformed(_) => "malformed",
            Self::NoSubscribers => "no_subscribers",
            Self::Dispatched { .. } => "dispatched",
        }
    }
}

/// Classification → extraction → dispatch for webhook payloads.
pub struct EventPipeline {
    policy: ConfirmationPolicy,
    dispatcher: NotificationDispatcher,
}

impl EventPipeline {
    pub fn new(policy: ConfirmationPolicy, dispatcher: NotificationDispatcher) -> Self {
        Self { policy, dispatcher }
    }

    /// Handles a raw request body. Never fails: every error becomes a logged
    /// outcome.
    pub async fn process(&self, body: &[u8]) -> ProcessOutcome {
        let outcome = match WebhookEvent::from_slice(body) {
            Ok(event) => self.handle(&event).await,
            Err(err) => ProcessOutcome::Malformed(err),
        };
        record(&outcome);
        outcome
    }

    pub async fn process_event(&self, event: &WebhookEvent) -> ProcessOutcome {
        let outcome = self.handle(event).await;
        record(&outcome);
        outcome
    }

    async fn handle(&self, event: &WebhookEvent) -> ProcessOutcome {
        // 1. Drop connectivity pings and states the policy does not notify on.
        let kind = match classify(event, self.policy) {
            NotificationState::Notifiable(kind) => kind,
            NotificationState::Ignored(reason) => {
                info!(
                    reason = reason.as_ref(),
                    confirmed = event.confirmed,
                    retries = event.retries,
                    tag = %event.tag,
                    stream_id = event.stream_id.as_deref().unwrap_or_default(),
                    chain_id = event.chain_id.as_deref().unwrap_or_default(),
                    "ignored webhook event"
                );
                return ProcessOutcome::Ignored(reason);
            }
        };

        // 2. Attribute the event to watched addresses.
        let addresses = extract_addresses(event);
        debug!(
            count = addresses.len(),
            kind = kind.as_ref(),
            stream_id = event.stream_id.as_deref().unwrap_or_default(),
            chain_id = event.chain_id.as_deref().unwrap_or_default(),
            "extracted trigger addresses"
        );

        // 3. Resolve subscribers and deliver.
        match self.dispatcher.dispatch(event, kind, &addresses).await {
            Ok(DispatchOutcome::NoRecipients) => {
                info!(tag = %event.tag, "no interested subscriber for event");
                ProcessOutcome::NoSubscribers
            }
            Ok(DispatchOutcome::Completed(report)) => {
                histogram!("webhook_event_recipients").record(report.attempted.len() as f64);
                ProcessOutcome::Dispatched { kind, report }
            }
            Err(err) => ProcessOutcome::Malformed(err),
        }
    }
}

fn record(outcome: &ProcessOutcome) {
    counter!("webhook_events_total", "outcome" => outcome.label()).increment(1);
    if let ProcessOutcome::Malformed(err) = outcome {
        warn!(error = %err, "skipping malformed webhook event");
    }
}
