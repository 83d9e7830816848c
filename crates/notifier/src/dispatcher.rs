use std::{collections::BTreeSet, sync::Arc};

use chainwatch_domain::model::{MalformedEventError, NotificationKind, WebhookEvent};
use chainwatch_domain::services::registry::SubscriptionRegistry;
use futures::future::join_all;
use metrics::counter;
use tracing::{info, warn};

use crate::extractor::AddressSet;
use crate::render::{render_activity, Notification, RenderOptions};
use crate::transport::{DeliveryError, Mailer, OutgoingMessage};

/// Distinct contacts interested in one event.
pub type RecipientSet = BTreeSet<String>;

/// Per-event delivery summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: Vec<String>,
    pub failed: Vec<(String, DeliveryError)>,
}

impl DispatchReport {
    pub fn delivered(&self) -> usize {
        self.attempted.len() - self.failed.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No extracted address belongs to a subscriber; nothing was rendered or sent.
    NoRecipients,
    Completed(DispatchReport),
}

pub struct NotificationDispatcher {
    registry: Arc<dyn SubscriptionRegistry>,
    mailer: Arc<dyn Mailer>,
    options: RenderOptions,
}

impl NotificationDispatcher {
    pub fn new(
        registry: Arc<dyn SubscriptionRegistry>,
        mailer: Arc<dyn Mailer>,
        options: RenderOptions,
    ) -> Self {
        Self {
            registry,
            mailer,
            options,
        }
    }

    pub fn resolve_recipients(&self, addresses: &AddressSet) -> RecipientSet {
        addresses
            .iter()
            .filter_map(|address| self.registry.lookup(address))
            .collect()
    }

    /// Resolves, renders once, and delivers to every distinct recipient.
    pub async fn dispatch(
        &self,
        event: &WebhookEvent,
        kind: NotificationKind,
        addresses: &AddressSet,
    ) -> Result<DispatchOutcome, MalformedEventError> {
        let recipients = self.resolve_recipients(addresses);
        if recipients.is_empty() {
            return Ok(DispatchOutcome::NoRecipients);
        }

        let notification = render_activity(event, kind, &self.options)?;
        let report = self.deliver(&recipients, &notification, &event.tag).await;
        Ok(DispatchOutcome::Completed(report))
    }

    /// Sends `notification` to all recipients concurrently and waits for every
    /// attempt to settle. Each recipient gets exactly one attempt.
    pub async fn deliver(
        &self,
        recipients: &RecipientSet,
        notification: &Notification,
        tag: &str,
    ) -> DispatchReport {
        let attempts = recipients.iter().map(|recipient| async move {
            let message = OutgoingMessage::new(recipient.as_str(), notification);
            let result = self.mailer.send(&message).await;
            (recipient, result)
        });

        let mut report = DispatchReport::default();
        for (recipient, result) in join_all(attempts).await {
            report.attempted.push(recipient.clone());
            match result {
                Ok(()) => {
                    counter!("notifications_sent_total", "result" => "delivered").increment(1);
                }
                Err(err) => {
                    counter!("notifications_sent_total", "result" => "failed").increment(1);
                    warn!(recipient = %recipient, tag, error = %err, "notification delivery failed");
                    report.failed.push((recipient.clone(), err));
                }
            }
        }

        info!(
            tag,
            attempted = report.attempted.len(),
            failed = report.failed.len(),
            "event notifications settled"
        );
        report
    }
}
