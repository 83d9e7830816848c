//! Upstream stream registration (Moralis Streams REST API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use thiserror::Error;

mod types;

pub use types::{StreamId, StreamSpec};

use types::{AddAddressRequest, CreateStreamRequest, CreateStreamResponse};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("stream api request failed: {0}")]
    Http(String),
    #[error("stream api returned status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("stream api response could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RegistrationError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value.to_string())
        } else {
            Self::Http(value.to_string())
        }
    }
}

#[async_trait]
pub trait StreamRegistrar: Send + Sync {
    async fn create_stream(&self, spec: &StreamSpec) -> Result<StreamId, RegistrationError>;
    async fn add_address(&self, stream: &StreamId, address: &str)
        -> Result<(), RegistrationError>;
}

pub struct MoralisStreams {
    client: Client,
    base_url: String,
    api_key: String,
}

impl MoralisStreams {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(format!("chainwatch/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("X-API-Key", &self.api_key)
    }
}

#[async_trait]
impl StreamRegistrar for MoralisStreams {
    async fn create_stream(&self, spec: &StreamSpec) -> Result<StreamId, RegistrationError> {
        let url = format!("{}/streams/evm", self.base_url);
        let response = self
            .authorized(self.client.put(url))
            .json(&CreateStreamRequest::from(spec))
            .send()
            .await?;
        let created: CreateStreamResponse = ensure_success(response).await?.json().await?;
        Ok(StreamId::new(created.id))
    }

    async fn add_address(
        &self,
        stream: &StreamId,
        address: &str,
    ) -> Result<(), RegistrationError> {
        let url = format!("{}/streams/evm/{}/address", self.base_url, stream.as_str());
        let response = self
            .authorized(self.client.post(url))
            .json(&AddAddressRequest { address: [address] })
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response, RegistrationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "failed to read error body".to_string());
    Err(RegistrationError::Rejected {
        status: status.as_u16(),
        body,
    })
}
