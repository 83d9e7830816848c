//! Webhook payload as posted by the upstream stream provider.
//!
//! Every field is optional on the wire: test pings omit most of them, and
//! numeric scalars arrive either as JSON numbers or as decimal strings. The
//! types below absorb both shapes so that a partial payload decodes into an
//! empty-ish event instead of failing outright.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub confirmed: bool,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub retries: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tag: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub stream_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub chain_id: Option<String>,
    #[serde(default)]
    pub block: Option<Block>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub txs: Vec<NativeTransaction>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub txs_internal: Vec<InternalTransaction>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logs: Vec<ContractLog>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub erc20_transfers: Vec<Erc20Transfer>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nft_transfers: Vec<NftTransfer>,
}

impl WebhookEvent {
    /// Decodes a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, MalformedEventError> {
        serde_json::from_slice(body)
            .map_err(|err| MalformedEventError::InvalidPayload(err.to_string()))
    }

    /// `true` when at least one entry list carries data. Connectivity pings
    /// share the webhook shape but leave every list empty.
    pub fn is_substantive(&self) -> bool {
        !(self.txs.is_empty()
            && self.txs_internal.is_empty()
            && self.logs.is_empty()
            && self.erc20_transfers.is_empty()
            && self.nft_transfers.is_empty())
    }

    pub fn primary_transaction(&self) -> Option<&NativeTransaction> {
        self.txs.first()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Block {
    #[serde(default, deserialize_with = "lenient_string")]
    pub number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub hash: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: Option<String>,
}

/// Access to the addresses whose watch registration caused an entry to be
/// reported.
pub trait TriggeredBy {
    fn triggered_by(&self) -> &[String];
}

macro_rules! impl_triggered_by {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl TriggeredBy for $ty {
                fn triggered_by(&self) -> &[String] {
                    &self.triggered_by
                }
            }
        )+
    };
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeTransaction {
    #[serde(default, deserialize_with = "lenient_string")]
    pub hash: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub from_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub to_address: Option<String>,
    /// Amount in wei.
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub receipt_gas_used: Option<String>,
    #[serde(rename = "triggered_by", default, deserialize_with = "null_as_default")]
    pub triggered_by: Vec<String>,
}

/// Internal calls are only read for attribution.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InternalTransaction {
    #[serde(rename = "triggered_by", default, deserialize_with = "null_as_default")]
    pub triggered_by: Vec<String>,
}

/// Contract logs are only read for attribution.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractLog {
    #[serde(rename = "triggered_by", default, deserialize_with = "null_as_default")]
    pub triggered_by: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc20Transfer {
    #[serde(default, deserialize_with = "lenient_string")]
    pub from: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub to: Option<String>,
    /// Amount in the token's smallest unit.
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub token_symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub token_decimals: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub transaction_hash: Option<String>,
    #[serde(rename = "triggered_by", default, deserialize_with = "null_as_default")]
    pub triggered_by: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftTransfer {
    #[serde(default, deserialize_with = "lenient_string")]
    pub from: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub to: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub token_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub transaction_hash: Option<String>,
    #[serde(rename = "triggered_by", default, deserialize_with = "null_as_default")]
    pub triggered_by: Vec<String>,
}

impl_triggered_by!(
    NativeTransaction,
    InternalTransaction,
    ContractLog,
    Erc20Transfer,
    NftTransfer,
);

/// A payload that cannot be turned into a notification even though it was
/// accepted at the HTTP layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedEventError {
    #[error("payload is not a decodable webhook event: {0}")]
    InvalidPayload(String),
    #[error("payload is missing `{0}`")]
    MissingField(&'static str),
    #[error("`{field}` is not a base-10 amount: {value}")]
    InvalidAmount { field: &'static str, value: String },
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    })
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or_default())
}
