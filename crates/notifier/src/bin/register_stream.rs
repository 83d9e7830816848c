//! One-shot setup: creates a webhook stream and attaches the monitored address.

use std::io;

use chainwatch_domain::config::{ConfigError, RegistrationConfig};
use chainwatch_domain::model::{AddressFormatError, WatchedAddress};
use chainwatch_domain::services::telemetry::{init_telemetry, TelemetryConfig, TelemetryError};
use chainwatch_notifier::{MoralisStreams, RegistrationError, StreamRegistrar, StreamSpec};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
enum SetupError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("invalid MONITORED_ADDRESS: {0}")]
    Address(#[from] AddressFormatError),
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
    #[error("registration failed: {0}")]
    Registration(#[from] RegistrationError),
}

#[tokio::main]
async fn main() -> io::Result<()> {
    if let Err(err) = bootstrap().await {
        eprintln!("[register-stream] setup failed: {err}");
        return Err(io::Error::other(err.to_string()));
    }

    Ok(())
}

async fn bootstrap() -> Result<(), SetupError> {
    let config = RegistrationConfig::load_from_env()?;
    init_telemetry(&TelemetryConfig::from_env("REGISTER"))?;
    let address = WatchedAddress::parse(config.monitored_address())?;

    let streams = MoralisStreams::new(
        config.moralis_api_url(),
        config.moralis_api_key(),
        config.upstream_timeout(),
    )?;

    let spec = StreamSpec {
        webhook_url: config.webhook_url(),
        description: format!("Full activity for {address}"),
        tag: config.stream_tag().to_string(),
        chain_ids: config.chain_ids().to_vec(),
        include_native_txs: true,
        include_internal_txs: true,
        include_contract_logs: true,
    };

    let stream = streams.create_stream(&spec).await?;
    info!(stream_id = %stream, webhook_url = %spec.webhook_url, "stream created");

    streams.add_address(&stream, address.as_str()).await?;
    info!(stream_id = %stream, address = %address, "address attached; set STREAM_ID for the api");

    Ok(())
}
