use actix_web::{rt, web, HttpResponse};
use metrics::counter;
use tracing::debug;

use crate::state::AppState;

/// Acknowledges immediately; the body is classified and dispatched on a
/// detached task whose failures are only logged.
pub async fn webhook_handler(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    counter!("webhook_requests_total").increment(1);
    debug!(bytes = body.len(), "webhook received");

    let pipeline = state.pipeline();
    rt::spawn(async move {
        pipeline.process(&body).await;
    });

    HttpResponse::Ok().finish()
}
