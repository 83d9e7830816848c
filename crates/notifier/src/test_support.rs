//! Recording mailer and event fixtures shared by this crate's tests and,
//! through the `test-support` feature, by dependent crates.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chainwatch_domain::model::{Block, NativeTransaction, WebhookEvent};

use crate::extractor::AddressSet;
use crate::transport::{DeliveryError, Mailer, OutgoingMessage};

/// Captures successful sends; fails for configured recipients.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMessage>>,
    attempts: AtomicUsize,
    failing: HashSet<String>,
}

impl RecordingMailer {
    pub fn failing_for(recipients: &[&str]) -> Self {
        Self {
            failing: recipients.iter().map(|r| r.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&message.to) {
            return Err(DeliveryError::Rejected {
                status: 500,
                body: "mailbox unavailable".into(),
            });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub fn addresses(values: &[&str]) -> AddressSet {
    values.iter().map(|v| v.to_string()).collect()
}

/// One native transaction per entry of `triggers`.
pub fn confirmed_event(triggers: &[&[&str]]) -> WebhookEvent {
    let txs = triggers
        .iter()
        .enumerate()
        .map(|(index, triggered_by)| NativeTransaction {
            hash: Some(format!("0x{:064x}", index + 1)),
            from_address: Some(format!("0x{}", "1".repeat(40))),
            to_address: Some(format!("0x{}", "2".repeat(40))),
            value: Some("1500000000000000000".into()),
            receipt_gas_used: Some("21000".into()),
            triggered_by: triggered_by.iter().map(|a| a.to_string()).collect(),
        })
        .collect();

    WebhookEvent {
        confirmed: true,
        retries: 0,
        tag: "full_address_activity".into(),
        stream_id: Some("stream-123".into()),
        chain_id: Some("0xaa36a7".into()),
        block: Some(Block {
            number: Some("5123456".into()),
            hash: Some(format!("0x{}", "b".repeat(64))),
            timestamp: Some("1700000000".into()),
        }),
        txs,
        ..WebhookEvent::default()
    }
}
