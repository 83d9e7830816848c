//! Environment-driven configuration structures shared by all binaries.

use std::{env, str::FromStr, time::Duration};

use thiserror::Error;

use crate::model::ConfirmationPolicy;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_EXPLORER_TX_URL: &str = "https://etherscan.io/tx/";
const DEFAULT_MORALIS_API_URL: &str = "https://api.moralis-streams.com";
const DEFAULT_SENDGRID_API_URL: &str = "https://api.sendgrid.com";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;
const DEFAULT_STREAM_CHAIN_IDS: &str = "0xaa36a7";
const DEFAULT_STREAM_TAG: &str = "full_address_activity";

/// Configuration for the HTTP receiver: listeners, upstream credentials and
/// the confirmation policy applied to every webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    api_bind_address: String,
    internal_bind_address: Option<String>,
    moralis_api_key: String,
    moralis_api_url: String,
    stream_id: String,
    sendgrid_api_key: String,
    sendgrid_api_url: String,
    email_from: String,
    confirmation_policy: ConfirmationPolicy,
    explorer_tx_url: String,
    upstream_timeout: Duration,
}

impl ApiConfig {
    /// Loads only the environment variables required by the API binary.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        let api_bind_address = match get_optional_var("API_BIND_ADDRESS") {
            Some(address) => address,
            None => {
                let port = get_optional_number("PORT")?.unwrap_or(DEFAULT_PORT);
                format!("0.0.0.0:{port}")
            }
        };

        let confirmation_policy = match get_optional_var("CONFIRMATION_POLICY") {
            Some(raw) => ConfirmationPolicy::from_str(&raw)
                .map_err(|_| ConfigError::InvalidPolicy { value: raw })?,
            None => ConfirmationPolicy::default(),
        };

        Ok(Self {
            api_bind_address,
            internal_bind_address: get_optional_var("API_INTERNAL_BIND_ADDRESS"),
            moralis_api_key: get_required_var("MORALIS_API_KEY")?,
            moralis_api_url: get_optional_var("MORALIS_API_URL")
                .unwrap_or_else(|| DEFAULT_MORALIS_API_URL.to_string()),
            stream_id: get_required_var("STREAM_ID")?,
            sendgrid_api_key: get_required_var("SENDGRID_API_KEY")?,
            sendgrid_api_url: get_optional_var("SENDGRID_API_URL")
                .unwrap_or_else(|| DEFAULT_SENDGRID_API_URL.to_string()),
            email_from: get_required_var("EMAIL_FROM")?,
            confirmation_policy,
            explorer_tx_url: get_optional_var("EXPLORER_TX_URL")
                .unwrap_or_else(|| DEFAULT_EXPLORER_TX_URL.to_string()),
            upstream_timeout: upstream_timeout()?,
        })
    }

    pub fn api_bind_address(&self) -> &str {
        &self.api_bind_address
    }

    pub fn internal_bind_address(&self) -> Option<&str> {
        self.internal_bind_address.as_deref()
    }

    pub fn has_internal_listener(&self) -> bool {
        self.internal_bind_address.is_some()
    }

    pub fn moralis_api_key(&self) -> &str {
        &self.moralis_api_key
    }

    pub fn moralis_api_url(&self) -> &str {
        &self.moralis_api_url
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn sendgrid_api_key(&self) -> &str {
        &self.sendgrid_api_key
    }

    pub fn sendgrid_api_url(&self) -> &str {
        &self.sendgrid_api_url
    }

    pub fn email_from(&self) -> &str {
        &self.email_from
    }

    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        self.confirmation_policy
    }

    pub fn explorer_tx_url(&self) -> &str {
        &self.explorer_tx_url
    }

    pub fn upstream_timeout(&self) -> Duration {
        self.upstream_timeout
    }
}

/// Inputs for the one-time stream setup tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationConfig {
    moralis_api_key: String,
    moralis_api_url: String,
    webhook_base_url: String,
    monitored_address: String,
    chain_ids: Vec<String>,
    stream_tag: String,
    upstream_timeout: Duration,
}

impl RegistrationConfig {
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        let chain_ids = get_optional_var("STREAM_CHAIN_IDS")
            .unwrap_or_else(|| DEFAULT_STREAM_CHAIN_IDS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        if chain_ids.is_empty() {
            return Err(ConfigError::MissingVar {
                key: "STREAM_CHAIN_IDS",
            });
        }

        Ok(Self {
            moralis_api_key: get_required_var("MORALIS_API_KEY")?,
            moralis_api_url: get_optional_var("MORALIS_API_URL")
                .unwrap_or_else(|| DEFAULT_MORALIS_API_URL.to_string()),
            webhook_base_url: get_required_var("WEBHOOK_BASE_URL")?,
            monitored_address: get_required_var("MONITORED_ADDRESS")?,
            chain_ids,
            stream_tag: get_optional_var("STREAM_TAG")
                .unwrap_or_else(|| DEFAULT_STREAM_TAG.to_string()),
            upstream_timeout: upstream_timeout()?,
        })
    }

    pub fn moralis_api_key(&self) -> &str {
        &self.moralis_api_key
    }

    pub fn moralis_api_url(&self) -> &str {
        &self.moralis_api_url
    }

    /// Callback the upstream provider posts events to.
    pub fn webhook_url(&self) -> String {
        format!("{}/webhook/evm", self.webhook_base_url.trim_end_matches('/'))
    }

    pub fn monitored_address(&self) -> &str {
        &self.monitored_address
    }

    pub fn chain_ids(&self) -> &[String] {
        &self.chain_ids
    }

    pub fn stream_tag(&self) -> &str {
        &self.stream_tag
    }

    pub fn upstream_timeout(&self) -> Duration {
        self.upstream_timeout
    }
}

fn upstream_timeout() -> Result<Duration, ConfigError> {
    let secs = get_optional_number::<u64>("UPSTREAM_TIMEOUT_SECS")?
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS);
    Ok(Duration::from_secs(secs))
}

fn get_required_var(key: &'static str) -> Result<String, ConfigError> {
    get_optional_var(key).ok_or(ConfigError::MissingVar { key })
}

fn get_optional_var(key: &'static str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn get_optional_number<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    get_optional_var(key)
        .map(|raw| {
            raw.parse()
                .map_err(|source| ConfigError::InvalidNumber { key, source })
        })
        .transpose()
}

pub fn hydrate_env_file() -> Result<(), ConfigError> {
    if env::var_os("CHAINWATCH_SKIP_DOTENV").is_some() {
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(ConfigError::Dotenv { source: err }),
    }

    Ok(())
}

/// Errors emitted when `.env` hydration or environment parsing fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable `{key}`")]
    MissingVar { key: &'static str },
    #[error("invalid integer in `{key}`: {source}")]
    InvalidNumber {
        key: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("unknown confirmation policy `{value}` (expected `confirmed-only` or `low-latency`)")]
    InvalidPolicy { value: String },
    #[error("failed to load .env file: {source}")]
    Dotenv {
        #[from]
        source: dotenvy::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_GUARD: Mutex<()> = Mutex::new(());

    const OPTIONAL_KEYS: &[&str] = &[
        "API_BIND_ADDRESS",
        "API_INTERNAL_BIND_ADDRESS",
        "PORT",
        "CONFIRMATION_POLICY",
        "EXPLORER_TX_URL",
        "MORALIS_API_URL",
        "SENDGRID_API_URL",
        "UPSTREAM_TIMEOUT_SECS",
        "STREAM_CHAIN_IDS",
        "STREAM_TAG",
    ];

    fn set_env() {
        env::set_var("CHAINWATCH_SKIP_DOTENV", "1");
        env::set_var("MORALIS_API_KEY", "moralis-key");
        env::set_var("STREAM_ID", "stream-1");
        env::set_var("SENDGRID_API_KEY", "sendgrid-key");
        env::set_var("EMAIL_FROM", "alerts@example.com");
        env::set_var("WEBHOOK_BASE_URL", "https://hooks.example.com/");
        env::set_var("MONITORED_ADDRESS", "0x1111111111111111111111111111111111111111");
        for key in OPTIONAL_KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn api_config_applies_defaults() {
        let _guard = ENV_GUARD.lock().unwrap();
        set_env();

        let config = ApiConfig::load_from_env().expect("config loads");
        assert_eq!(config.api_bind_address(), "0.0.0.0:3000");
        assert!(!config.has_internal_listener());
        assert_eq!(config.stream_id(), "stream-1");
        assert_eq!(
            config.confirmation_policy(),
            ConfirmationPolicy::ConfirmedOnly
        );
        assert_eq!(config.explorer_tx_url(), DEFAULT_EXPLORER_TX_URL);
        assert_eq!(config.moralis_api_url(), DEFAULT_MORALIS_API_URL);
        assert_eq!(config.sendgrid_api_url(), DEFAULT_SENDGRID_API_URL);
        assert_eq!(config.upstream_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn api_config_reads_port_and_policy() {
        let _guard = ENV_GUARD.lock().unwrap();
        set_env();
        env::set_var("PORT", "8088");
        env::set_var("CONFIRMATION_POLICY", " low-latency ");
        env::set_var("API_INTERNAL_BIND_ADDRESS", "127.0.0.1:9090");
        env::set_var("UPSTREAM_TIMEOUT_SECS", "3");

        let config = ApiConfig::load_from_env().expect("config loads");
        assert_eq!(config.api_bind_address(), "0.0.0.0:8088");
        assert_eq!(config.confirmation_policy(), ConfirmationPolicy::LowLatency);
        assert_eq!(config.internal_bind_address(), Some("127.0.0.1:9090"));
        assert_eq!(config.upstream_timeout(), Duration::from_secs(3));

        set_env();
    }

    #[test]
    fn bind_address_overrides_port() {
        let _guard = ENV_GUARD.lock().unwrap();
        set_env();
        env::set_var("PORT", "8088");
        env::set_var("API_BIND_ADDRESS", "127.0.0.1:7000");

        let config = ApiConfig::load_from_env().expect("config loads");
        assert_eq!(config.api_bind_address(), "127.0.0.1:7000");

        set_env();
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let _guard = ENV_GUARD.lock().unwrap();
        set_env();
        env::set_var("CONFIRMATION_POLICY", "whenever");

        let err = ApiConfig::load_from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPolicy { value } if value == "whenever"));

        set_env();
    }

    #[test]
    fn malformed_port_is_rejected() {
        let _guard = ENV_GUARD.lock().unwrap();
        set_env();
        env::set_var("PORT", "eighty");

        let err = ApiConfig::load_from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { key: "PORT", .. }));

        set_env();
    }

    #[test]
    fn empty_required_env_var_is_treated_as_missing() {
        let _guard = ENV_GUARD.lock().unwrap();
        set_env();
        env::set_var("SENDGRID_API_KEY", "   ");

        let err = ApiConfig::load_from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingVar {
                key: "SENDGRID_API_KEY"
            }
        ));

        set_env();
    }

    #[test]
    fn registration_config_builds_webhook_url() {
        let _guard = ENV_GUARD.lock().unwrap();
        set_env();
        env::set_var("STREAM_CHAIN_IDS", "0x1, 0xaa36a7,");

        let config = RegistrationConfig::load_from_env().expect("config loads");
        assert_eq!(config.webhook_url(), "https://hooks.example.com/webhook/evm");
        assert_eq!(config.chain_ids(), ["0x1", "0xaa36a7"]);
        assert_eq!(config.stream_tag(), DEFAULT_STREAM_TAG);

        set_env();
    }

    #[test]
    fn registration_config_defaults_to_sepolia() {
        let _guard = ENV_GUARD.lock().unwrap();
        set_env();

        let config = RegistrationConfig::load_from_env().expect("config loads");
        assert_eq!(config.chain_ids(), ["0xaa36a7"]);
        assert_eq!(
            config.monitored_address(),
            "0x1111111111111111111111111111111111111111"
        );
    }
}
