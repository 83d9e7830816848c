use actix_web::{web::Data, HttpResponse};
use metrics::gauge;

use crate::state::AppState;

/// Prometheus exposition; refreshes the registry size gauge on each scrape.
pub async fn metrics_handler(state: Data<AppState>) -> HttpResponse {
    gauge!("subscriptions_registered").set(state.registry().len() as f64);
    let body = state.telemetry().render_metrics();
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(body)
}
