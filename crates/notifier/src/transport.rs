//! Email delivery.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

use crate::render::Notification;

/// One message addressed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl OutgoingMessage {
    pub fn new(to: impl Into<String>, notification: &Notification) -> Self {
        Self {
            to: to.into(),
            subject: notification.subject.clone(),
            html: notification.html.clone(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("transport request failed: {0}")]
    Http(String),
    #[error("transport rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl From<reqwest::Error> for DeliveryError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value.to_string())
    }
}

/// A single delivery attempt; implementations must not retry.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), DeliveryError>;
}

/// SendGrid v3 `mail/send` client.
pub struct SendGridMailer {
    client: Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl SendGridMailer {
    pub fn new(
        api_url: &str,
        api_key: impl Into<String>,
        from: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(format!("chainwatch/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/v3/mail/send", api_url.trim_end_matches('/')),
            api_key: api_key.into(),
            from: from.into(),
        })
    }
}

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: EmailAddress<'a>,
    subject: &'a str,
    content: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: [EmailAddress<'a>; 1],
}

#[derive(Debug, Serialize)]
struct EmailAddress<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), DeliveryError> {
        let body = MailRequest {
            personalizations: [Personalization {
                to: [EmailAddress { email: &message.to }],
            }],
            from: EmailAddress { email: &self.from },
            subject: &message.subject,
            content: [Content {
                kind: "text/html",
                value: &message.html,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
