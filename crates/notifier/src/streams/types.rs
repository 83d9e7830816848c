use serde::{Deserialize, Serialize};

/// What a new stream captures and where it posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSpec {
    pub webhook_url: String,
    pub description: String,
    pub tag: String,
    pub chain_ids: Vec<String>,
    pub include_native_txs: bool,
    pub include_internal_txs: bool,
    pub include_contract_logs: bool,
}

/// Opaque identifier assigned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamId(String);

impl StreamId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateStreamRequest<'a> {
    pub webhook_url: &'a str,
    pub description: &'a str,
    pub tag: &'a str,
    pub chain_ids: &'a [String],
    pub include_native_txs: bool,
    pub include_internal_txs: bool,
    pub include_contract_logs: bool,
}

impl<'a> From<&'a StreamSpec> for CreateStreamRequest<'a> {
    fn from(spec: &'a StreamSpec) -> Self {
        Self {
            webhook_url: &spec.webhook_url,
            description: &spec.description,
            tag: &spec.tag,
            chain_ids: &spec.chain_ids,
            include_native_txs: spec.include_native_txs,
            include_internal_txs: spec.include_internal_txs,
            include_contract_logs: spec.include_contract_logs,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateStreamResponse {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AddAddressRequest<'a> {
    pub address: [&'a str; 1],
}
