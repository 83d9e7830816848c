use actix_web::{web, HttpResponse};
use chainwatch_domain::model::{ContactEmail, WatchedAddress};
use chainwatch_notifier::{render_subscription_confirmation, OutgoingMessage};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::state::AppState;

use super::ApiError;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscribeResponse {
    pub success: bool,
    pub message: String,
}

pub async fn subscribe_handler(
    state: web::Data<AppState>,
    payload: web::Json<SubscribeRequest>,
) -> Result<HttpResponse, ApiError> {
    let (address, email) = validate(payload.into_inner()).inspect_err(|err| {
        counter!("api_subscribe_requests_total", "status" => "invalid").increment(1);
        info!(error = %err, "rejected subscribe request");
    })?;

    subscribe(&state, &address, &email).await.inspect_err(|err| {
        counter!("api_subscribe_requests_total", "status" => "upstream_error").increment(1);
        error!(address = %address, error = %err, "subscription failed");
    })?;

    counter!("api_subscribe_requests_total", "status" => "success").increment(1);
    info!(address = %address, "subscription stored");
    Ok(HttpResponse::Ok().json(SubscribeResponse {
        success: true,
        message: format!("Subscribed {email} to activity on {address}"),
    }))
}

fn validate(request: SubscribeRequest) -> Result<(WatchedAddress, ContactEmail), ApiError> {
    let address = non_blank(request.address).ok_or(ApiError::MissingField("address"))?;
    let email = non_blank(request.email).ok_or(ApiError::MissingField("email"))?;
    Ok((WatchedAddress::parse(&address)?, ContactEmail::parse(&email)?))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

async fn subscribe(
    state: &AppState,
    address: &WatchedAddress,
    email: &ContactEmail,
) -> Result<(), ApiError> {
    // The upstream stream must know the address before we promise alerts for it.
    state
        .registrar()
        .add_address(state.stream_id(), address.as_str())
        .await?;
    state.registry().put(address.as_str(), email.as_str());

    let confirmation = render_subscription_confirmation(address);
    state
        .mailer()
        .send(&OutgoingMessage::new(email.as_str(), &confirmation))
        .await?;
    Ok(())
}
