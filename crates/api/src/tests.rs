use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use actix_web::{body::to_bytes, http::StatusCode, test, web, App};
use async_trait::async_trait;
use chainwatch_domain::model::ConfirmationPolicy;
use chainwatch_domain::services::{
    registry::{InMemorySubscriptionRegistry, SubscriptionRegistry},
    telemetry::{init_telemetry, TelemetryConfig, TelemetryGuard},
};
use chainwatch_notifier::test_support::RecordingMailer;
use chainwatch_notifier::{
    EventPipeline, NotificationDispatcher, OutgoingMessage, RegistrationError, RenderOptions,
    StreamId, StreamRegistrar, StreamSpec,
};
use serde_json::{json, Value};
use tokio::time::sleep;

use crate::handlers::{
    json_error_handler, metrics_handler,
    subscribe::{SubscribeRequest, SubscribeResponse},
    subscribe_handler, webhook_handler,
};
use crate::state::AppState;

const STREAM: &str = "stream-123";

#[derive(Default)]
struct RecordingRegistrar {
    added: Mutex<Vec<(String, String)>>,
    reject: AtomicBool,
}

#[async_trait]
impl StreamRegistrar for RecordingRegistrar {
    async fn create_stream(&self, _spec: &StreamSpec) -> Result<StreamId, RegistrationError> {
        Ok(StreamId::new(STREAM))
    }

    async fn add_address(
        &self,
        stream: &StreamId,
        address: &str,
    ) -> Result<(), RegistrationError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(RegistrationError::Rejected {
                status: 401,
                body: "invalid api key".into(),
            });
        }
        self.added
            .lock()
            .unwrap()
            .push((stream.to_string(), address.to_string()));
        Ok(())
    }
}

struct Harness {
    state: AppState,
    registry: Arc<InMemorySubscriptionRegistry>,
    registrar: Arc<RecordingRegistrar>,
    mailer: Arc<RecordingMailer>,
}

fn telemetry() -> TelemetryGuard {
    let config = TelemetryConfig::from_env("API_TEST");
    init_telemetry(&config).expect("telemetry inits")
}

fn harness(policy: ConfirmationPolicy) -> Harness {
    let registry = Arc::new(InMemorySubscriptionRegistry::new());
    let registrar = Arc::new(RecordingRegistrar::default());
    let mailer = Arc::new(RecordingMailer::default());
    let pipeline = Arc::new(EventPipeline::new(
        policy,
        NotificationDispatcher::new(registry.clone(), mailer.clone(), RenderOptions::default()),
    ));
    let state = AppState::new(
        registry.clone(),
        registrar.clone(),
        mailer.clone(),
        pipeline,
        StreamId::new(STREAM),
        telemetry(),
    );
    Harness {
        state,
        registry,
        registrar,
        mailer,
    }
}

fn watched(fill: char) -> String {
    format!("0x{}", fill.to_string().repeat(40))
}

/// Waits for the detached webhook task to deliver `count` messages.
async fn wait_for_sent(mailer: &RecordingMailer, count: usize) -> Vec<OutgoingMessage> {
    for _ in 0..100 {
        if mailer.sent().len() >= count {
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    mailer.sent()
}

fn activity_payload(triggered_by: &[String], confirmed: bool, retries: u32) -> Value {
    json!({
        "confirmed": confirmed,
        "retries": retries,
        "tag": "full_address_activity",
        "streamId": STREAM,
        "chainId": "0xaa36a7",
        "block": {
            "number": "5123456",
            "hash": format!("0x{}", "b".repeat(64)),
            "timestamp": "1700000000"
        },
        "txs": [{
            "hash": format!("0x{}", "c".repeat(64)),
            "fromAddress": watched('1'),
            "toAddress": watched('2'),
            "value": "1500000000000000000",
            "receiptGasUsed": "21000",
            "triggered_by": triggered_by
        }],
        "txsInternal": [],
        "logs": [],
        "erc20Transfers": [],
        "nftTransfers": []
    })
}

macro_rules! subscribe_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .app_data(web::JsonConfig::default().error_handler(json_error_handler))
                .route("/subscribe", web::post().to(subscribe_handler)),
        )
        .await
    };
}

macro_rules! webhook_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .route("/webhook/evm", web::post().to(webhook_handler))
                .route("/metrics", web::get().to(metrics_handler)),
        )
        .await
    };
}

#[actix_web::test]
async fn subscribe_registers_stores_and_confirms() {
    let h = harness(ConfirmationPolicy::ConfirmedOnly);
    let app = subscribe_app!(h.state.clone());
    let req = test::TestRequest::post()
        .uri("/subscribe")
        .set_json(&SubscribeRequest {
            address: Some(format!("  {}  ", watched('A'))),
            email: Some("user@example.com".into()),
        })
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: SubscribeResponse = test::read_body_json(resp).await;
    assert!(body.success);

    let lowered = watched('a');
    assert_eq!(
        *h.registrar.added.lock().unwrap(),
        vec![(STREAM.to_string(), lowered.clone())]
    );
    assert_eq!(
        h.registry.lookup(&lowered).as_deref(),
        Some("user@example.com")
    );
    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "user@example.com");
    assert_eq!(
        sent[0].subject,
        format!("✅ Subscribed to on-chain alerts for {lowered}")
    );
}

#[actix_web::test]
async fn subscribe_rejects_invalid_address() {
    let h = harness(ConfirmationPolicy::ConfirmedOnly);
    let app = subscribe_app!(h.state.clone());
    let req = test::TestRequest::post()
        .uri("/subscribe")
        .set_json(&SubscribeRequest {
            address: Some("0xdeadbeef".into()),
            email: Some("user@example.com".into()),
        })
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("invalid address"));
    assert!(h.registrar.added.lock().unwrap().is_empty());
    assert!(h.registry.is_empty());
}

#[actix_web::test]
async fn subscribe_rejects_missing_or_invalid_email() {
    let h = harness(ConfirmationPolicy::ConfirmedOnly);
    let app = subscribe_app!(h.state.clone());

    let missing = test::TestRequest::post()
        .uri("/subscribe")
        .set_json(json!({ "address": watched('a') }))
        .to_request();
    let resp = test::call_service(&app, missing).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "missing required field `email`");

    let invalid = test::TestRequest::post()
        .uri("/subscribe")
        .set_json(&SubscribeRequest {
            address: Some(watched('a')),
            email: Some("not-an-email".into()),
        })
        .to_request();
    let resp = test::call_service(&app, invalid).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert!(h.mailer.sent().is_empty());
}

#[actix_web::test]
async fn subscribe_rejects_non_json_body() {
    let h = harness(ConfirmationPolicy::ConfirmedOnly);
    let app = subscribe_app!(h.state.clone());
    let req = test::TestRequest::post()
        .uri("/subscribe")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("invalid request body"));
}

#[actix_web::test]
async fn subscribe_hides_upstream_failure() {
    let h = harness(ConfirmationPolicy::ConfirmedOnly);
    h.registrar.reject.store(true, Ordering::SeqCst);
    let app = subscribe_app!(h.state.clone());
    let req = test::TestRequest::post()
        .uri("/subscribe")
        .set_json(&SubscribeRequest {
            address: Some(watched('a')),
            email: Some("user@example.com".into()),
        })
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "error": "failed to subscribe" }));
    assert!(h.registry.is_empty());
    assert!(h.mailer.sent().is_empty());
}

#[actix_web::test]
async fn empty_ping_is_acknowledged_and_ignored() {
    let h = harness(ConfirmationPolicy::ConfirmedOnly);
    h.registry.put(&watched('a'), "user@example.com");
    let app = webhook_app!(h.state.clone());
    let req = test::TestRequest::post()
        .uri("/webhook/evm")
        .set_json(json!({
            "confirmed": false,
            "retries": 0,
            "tag": "",
            "txs": [],
            "txsInternal": [],
            "logs": [],
            "erc20Transfers": [],
            "nftTransfers": []
        }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = to_bytes(resp.into_body()).await.unwrap();
    assert!(body.is_empty());

    sleep(Duration::from_millis(50)).await;
    assert!(h.mailer.sent().is_empty());
}

#[actix_web::test]
async fn confirmed_event_fans_out_to_each_subscriber() {
    let h = harness(ConfirmationPolicy::ConfirmedOnly);
    h.registry.put(&watched('a'), "alice@example.com");
    h.registry.put(&watched('b'), "bob@example.com");
    let app = webhook_app!(h.state.clone());
    let req = test::TestRequest::post()
        .uri("/webhook/evm")
        .set_json(activity_payload(&[watched('A'), watched('b')], true, 0))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let mut sent = wait_for_sent(&h.mailer, 2).await;
    assert_eq!(sent.len(), 2);
    sent.sort_by(|left, right| left.to.cmp(&right.to));
    assert_eq!(sent[0].to, "alice@example.com");
    assert_eq!(sent[1].to, "bob@example.com");
    assert_eq!(sent[0].subject, "🔔 Activity on full_address_activity");
    assert_eq!(sent[0].subject, sent[1].subject);
    assert_eq!(sent[0].html, sent[1].html);
    assert!(sent[0].html.contains("1.5000"));
}

#[actix_web::test]
async fn low_latency_skips_redelivered_unconfirmed_event() {
    let h = harness(ConfirmationPolicy::LowLatency);
    h.registry.put(&watched('a'), "user@example.com");
    let app = webhook_app!(h.state.clone());

    for retries in [0, 1] {
        let req = test::TestRequest::post()
            .uri("/webhook/evm")
            .set_json(activity_payload(&[watched('a')], false, retries))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    wait_for_sent(&h.mailer, 1).await;
    sleep(Duration::from_millis(50)).await;
    let sent = h.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].subject.starts_with("⏳ Pending activity"));
}

#[actix_web::test]
async fn malformed_webhook_is_still_acknowledged() {
    let h = harness(ConfirmationPolicy::ConfirmedOnly);
    h.registry.put(&watched('a'), "user@example.com");
    let app = webhook_app!(h.state.clone());
    let req = test::TestRequest::post()
        .uri("/webhook/evm")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"txs\": [")
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    sleep(Duration::from_millis(50)).await;
    assert!(h.mailer.sent().is_empty());
}

#[actix_web::test]
async fn metrics_endpoint_exposes_prometheus_text() {
    let h = harness(ConfirmationPolicy::ConfirmedOnly);
    let app = webhook_app!(h.state.clone());
    let ping = test::TestRequest::post()
        .uri("/webhook/evm")
        .set_json(json!({ "txs": [] }))
        .to_request();
    test::call_service(&app, ping).await;

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = to_bytes(resp.into_body()).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("webhook_requests_total"));
    assert!(text.contains("subscriptions_registered"));
}
