//! Webhook-to-email pipeline and upstream clients.
//!
//! The API process embeds [`EventPipeline`] and hands it raw webhook bodies;
//! the `register-stream` binary uses [`MoralisStreams`] for one-off setup.

pub mod classifier;
pub mod dispatcher;
pub mod extractor;
pub mod pipeline;
pub mod render;
pub mod streams;
pub mod transport;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use classifier::classify;
pub use dispatcher::{DispatchOutcome, DispatchReport, NotificationDispatcher, RecipientSet};
pub use extractor::{extract_addresses, AddressSet};
pub use pipeline::{EventPipeline, ProcessOutcome};
pub use render::{
    format_units, render_activity, render_subscription_confirmation, Notification, RenderOptions,
};
pub use streams::{MoralisStreams, RegistrationError, StreamId, StreamRegistrar, StreamSpec};
pub use transport::{DeliveryError, Mailer, OutgoingMessage, SendGridMailer};
