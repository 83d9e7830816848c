use std::sync::Arc;

use chainwatch_domain::services::{registry::SubscriptionRegistry, telemetry::TelemetryGuard};
use chainwatch_notifier::{EventPipeline, Mailer, StreamId, StreamRegistrar};

/// Collaborators shared by every worker; all clones point at the same instances.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<dyn SubscriptionRegistry>,
    registrar: Arc<dyn StreamRegistrar>,
    mailer: Arc<dyn Mailer>,
    pipeline: Arc<EventPipeline>,
    stream_id: StreamId,
    telemetry: TelemetryGuard,
}

impl AppState {
    pub fn new(
        registry: Arc<dyn SubscriptionRegistry>,
        registrar: Arc<dyn StreamRegistrar>,
        mailer: Arc<dyn Mailer>,
        pipeline: Arc<EventPipeline>,
        stream_id: StreamId,
        telemetry: TelemetryGuard,
    ) -> Self {
        Self {
            registry,
            registrar,
            mailer,
            pipeline,
            stream_id,
            telemetry,
        }
    }

    pub fn registry(&self) -> &dyn SubscriptionRegistry {
        self.registry.as_ref()
    }

    pub fn registrar(&self) -> &dyn StreamRegistrar {
        self.registrar.as_ref()
    }

    pub fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }

    /// Owned handle for work that outlives the request.
    pub fn pipeline(&self) -> Arc<EventPipeline> {
        Arc::clone(&self.pipeline)
    }

    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    pub fn telemetry(&self) -> &TelemetryGuard {
        &self.telemetry
    }
}
