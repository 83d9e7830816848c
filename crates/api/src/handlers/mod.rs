pub mod metrics;
pub mod subscribe;
pub mod webhook;

pub use metrics::metrics_handler;
pub use subscribe::subscribe_handler;
pub use webhook::webhook_handler;

use actix_web::{error::JsonPayloadError, http::StatusCode, HttpRequest, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use chainwatch_domain::model::{AddressFormatError, ContactFormatError};
use chainwatch_notifier::{DeliveryError, RegistrationError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressFormatError),
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] ContactFormatError),
    #[error("stream registration failed: {0}")]
    Registration(#[from] RegistrationError),
    #[error("confirmation delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}

impl ApiError {
    fn is_client_error(&self) -> bool {
        matches!(
            self,
            ApiError::InvalidBody(_)
                | ApiError::MissingField(_)
                | ApiError::InvalidAddress(_)
                | ApiError::InvalidEmail(_)
        )
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Upstream detail stays in the logs.
        let error = if self.is_client_error() {
            self.to_string()
        } else {
            "failed to subscribe".to_string()
        };
        HttpResponse::build(self.status_code()).json(ErrorBody { error })
    }
}

/// Maps JSON extractor failures onto the API's error body.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::InvalidBody(err.to_string()).into()
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
