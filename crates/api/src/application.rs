use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use chainwatch_domain::config::{ApiConfig, ConfigError};
use chainwatch_domain::services::{
    registry::InMemorySubscriptionRegistry,
    telemetry::{init_telemetry, TelemetryConfig, TelemetryError},
};
use chainwatch_notifier::{
    EventPipeline, MoralisStreams, NotificationDispatcher, RenderOptions, SendGridMailer, StreamId,
};
use thiserror::Error;
use tracing::info;

use crate::{
    handlers::{json_error_handler, metrics_handler, subscribe_handler, webhook_handler},
    state::AppState,
};

/// Upper bound for webhook bodies; busy blocks produce large payloads.
pub const WEBHOOK_PAYLOAD_LIMIT: usize = 4 * 1024 * 1024;

pub async fn run() -> Result<(), BootstrapError> {
    // 1. Configuration and telemetry.
    let config = ApiConfig::load_from_env()?;
    let telemetry = init_telemetry(&TelemetryConfig::from_env("API"))?;

    // 2. Upstream clients.
    let registrar = Arc::new(MoralisStreams::new(
        config.moralis_api_url(),
        config.moralis_api_key(),
        config.upstream_timeout(),
    )?);
    let mailer = Arc::new(SendGridMailer::new(
        config.sendgrid_api_url(),
        config.sendgrid_api_key(),
        config.email_from(),
        config.upstream_timeout(),
    )?);

    // 3. Registry and event pipeline share the same mailer.
    let registry = Arc::new(InMemorySubscriptionRegistry::new());
    let dispatcher = NotificationDispatcher::new(
        registry.clone(),
        mailer.clone(),
        RenderOptions::new(config.explorer_tx_url()),
    );
    let pipeline = Arc::new(EventPipeline::new(config.confirmation_policy(), dispatcher));

    let state = AppState::new(
        registry,
        registrar,
        mailer,
        pipeline,
        StreamId::new(config.stream_id()),
        telemetry,
    );

    let include_metrics_on_public = !config.has_internal_listener();
    let public_state = state.clone();

    // 4. Public listener: subscriptions and provider callbacks.
    let public_server = HttpServer::new(move || {
        let mut app = App::new()
            .app_data(web::Data::new(public_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::PayloadConfig::new(WEBHOOK_PAYLOAD_LIMIT))
            .wrap(Logger::default())
            .route("/subscribe", web::post().to(subscribe_handler))
            .route("/webhook/evm", web::post().to(webhook_handler));

        if include_metrics_on_public {
            app = app.route("/metrics", web::get().to(metrics_handler));
        }

        app
    })
    .bind(config.api_bind_address())?
    .run();

    info!(
        bind = config.api_bind_address(),
        policy = config.confirmation_policy().as_ref(),
        stream_id = config.stream_id(),
        "api listening"
    );

    // 5. Optional internal listener owns /metrics when configured.
    let internal_server = match config.internal_bind_address() {
        Some(addr) => {
            let internal_state = state.clone();
            let server = HttpServer::new(move || {
                App::new()
                    .app_data(web::Data::new(internal_state.clone()))
                    .wrap(Logger::default())
                    .route("/metrics", web::get().to(metrics_handler))
            })
            .bind(addr)?
            .run();
            info!(bind = addr, "internal listener enabled");
            Some(server)
        }
        None => None,
    };

    if let Some(internal) = internal_server {
        tokio::try_join!(public_server, internal)?;
    } else {
        public_server.await?;
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
