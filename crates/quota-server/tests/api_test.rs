//! HTTP API tests driven through the router with `oneshot`.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use quota_audit::{PublishError, RecordingPublisher};
use quota_core::EventDecision;
use quota_engine::{QuotaConfig, QuotaCoordinator};
use quota_server::{create_router, AppState};
use quota_store::{InMemoryLimitStore, StoreConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: Arc<InMemoryLimitStore>,
    publisher: Arc<RecordingPublisher>,
}

fn test_app() -> TestApp {
    let store = Arc::new(InMemoryLimitStore::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let coordinator = QuotaCoordinator::from_config(
        store.clone(),
        &StoreConfig::default(),
        &QuotaConfig::default(),
        publisher.clone(),
    )
    .unwrap();
    TestApp {
        router: create_router(AppState::new(Arc::new(coordinator))),
        store,
        publisher,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn put_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn trade(user: &str, amount: f64) -> String {
    json!({
        "user_id": user,
        "symbol": "AAPL",
        "action": "buy",
        "amount": amount,
        "price": 187.25,
    })
    .to_string()
}

const EVALUATE: &str = "/api/v1/risk/evaluate-trade";

#[tokio::test]
async fn health_check() {
    let app = test_app();
    let (status, body) = send(&app.router, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "service": "risk-management" }));
}

#[tokio::test]
async fn approved_trade_has_no_reason() {
    let app = test_app();
    let (status, body) = send(&app.router, post_json(EVALUATE, &trade("u1", 4000.0))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "approved": true }));
}

#[tokio::test]
async fn daily_limit_exceeded() {
    let app = test_app();
    for amount in [5000.0, 2000.0] {
        let (_, body) = send(&app.router, post_json(EVALUATE, &trade("u2", amount))).await;
        assert_eq!(body["approved"], true);
    }

    let (status, body) = send(&app.router, post_json(EVALUATE, &trade("u2", 4000.0))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["approved"], false);
    assert_eq!(body["reason"], "DAILY_LIMIT_EXCEEDED");
    assert_eq!(body["message"], "Daily trading limit exceeded");
}

#[tokio::test]
async fn large_trade_requires_review() {
    let app = test_app();
    let (status, body) = send(&app.router, post_json(EVALUATE, &trade("u3", 6000.0))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["approved"], false);
    assert_eq!(body["reason"], "LARGE_TRADE_MANUAL_REVIEW");
}

#[tokio::test]
async fn exactly_half_the_limit_is_approved() {
    let app = test_app();
    let (_, body) = send(&app.router, post_json(EVALUATE, &trade("u4", 5000.0))).await;
    assert_eq!(body["approved"], true);
}

#[tokio::test]
async fn malformed_input_is_bad_request() {
    let app = test_app();
    let cases = [
        "{not json".to_string(),
        json!({ "user_id": "u5", "symbol": "AAPL", "action": "buy" }).to_string(),
        json!({ "user_id": "u5", "symbol": "AAPL", "action": "hold", "amount": 1, "price": 1 })
            .to_string(),
        trade("u5", -10.0),
        trade("u5", 0.0),
        trade("", 10.0),
        trade("u5", 0.00001),
        json!({ "user_id": "u5", "symbol": "", "action": "sell", "amount": 1, "price": 1 })
            .to_string(),
    ];

    for body in cases {
        let (status, response) = send(&app.router, post_json(EVALUATE, &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
        assert!(response["error"].is_string(), "body: {body}");
    }
    assert_eq!(app.publisher.attempts(), 0);
}

#[tokio::test]
async fn sub_cent_price_is_accepted() {
    let app = test_app();
    let body = json!({
        "user_id": "u16",
        "symbol": "PEPE-USD",
        "action": "buy",
        "amount": 100,
        "price": 0.00001234,
    })
    .to_string();

    let (status, body) = send(&app.router, post_json(EVALUATE, &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "approved": true }));
    assert_eq!(app.publisher.attempts(), 1);
}

#[tokio::test]
async fn missing_content_type_is_bad_request() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri(EVALUATE)
        .body(Body::from(trade("u6", 10.0)))
        .unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn store_outage_is_server_error() {
    let app = test_app();
    app.store.set_unavailable(true);

    let (status, body) = send(&app.router, post_json(EVALUATE, &trade("u7", 100.0))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Evaluation unavailable");

    let (status, _) = send(&app.router, get("/api/v1/risk/user-limits/u7")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn commit_failure_is_server_error_with_unavailable_event() {
    let app = test_app();
    app.store.set_commits_unavailable(true);

    let (status, _) = send(&app.router, post_json(EVALUATE, &trade("u8", 100.0))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let events = app.publisher.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].decision, EventDecision::Unavailable);
}

#[tokio::test]
async fn publish_failure_does_not_change_response() {
    let app = test_app();
    app.publisher.set_failure(Some(PublishError::TransportClosed));

    let (status, body) = send(&app.router, post_json(EVALUATE, &trade("u9", 100.0))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "approved": true }));
    assert_eq!(app.publisher.attempts(), 1);
}

#[tokio::test]
async fn user_limits_reflect_committed_trades() {
    let app = test_app();
    send(&app.router, post_json(EVALUATE, &trade("u10", 2500.5))).await;

    let (status, body) = send(&app.router, get("/api/v1/risk/user-limits/u10")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "u10");
    assert_eq!(body["daily_limit"].as_f64(), Some(10000.0));
    assert_eq!(body["daily_traded"].as_f64(), Some(2500.5));
    assert_eq!(body["remaining"].as_f64(), Some(7499.5));
}

#[tokio::test]
async fn limit_override_round_trip() {
    let app = test_app();
    let (status, body) = send(
        &app.router,
        put_json("/api/v1/risk/user-limits/u11", r#"{"daily_limit": 50000}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["daily_limit"].as_f64(), Some(50000.0));

    // 20000 is above the default large-trade threshold but below the override's
    let (_, body) = send(&app.router, post_json(EVALUATE, &trade("u11", 20000.0))).await;
    assert_eq!(body["approved"], true);

    let (_, body) = send(&app.router, get("/api/v1/risk/user-limits/u11")).await;
    assert_eq!(body["remaining"].as_f64(), Some(30000.0));
}

#[tokio::test]
async fn lowered_limit_reports_zero_remaining() {
    let app = test_app();
    send(&app.router, post_json(EVALUATE, &trade("u12", 4000.0))).await;
    send(
        &app.router,
        put_json("/api/v1/risk/user-limits/u12", r#"{"daily_limit": 1000}"#),
    )
    .await;

    let (_, body) = send(&app.router, get("/api/v1/risk/user-limits/u12")).await;
    assert_eq!(body["remaining"].as_f64(), Some(0.0));

    let (_, body) = send(&app.router, post_json(EVALUATE, &trade("u12", 1.0))).await;
    assert_eq!(body["reason"], "DAILY_LIMIT_EXCEEDED");
}

#[tokio::test]
async fn invalid_limit_override_is_bad_request() {
    let app = test_app();
    for body in [r#"{"daily_limit": 0}"#, r#"{"daily_limit": -5}"#, r#"{}"#] {
        let (status, _) = send(
            &app.router,
            put_json("/api/v1/risk/user-limits/u13", body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
    }
}

#[tokio::test]
async fn metrics_endpoint_exposes_decisions() {
    let app = test_app();
    send(&app.router, post_json(EVALUATE, &trade("u14", 100.0))).await;

    let response = app.router.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("quota_decisions_total"));
    assert!(text.contains("quota_evaluation_latency_ms"));
}

#[tokio::test]
async fn concurrent_requests_respect_limit() {
    let app = test_app();
    let requests = (0..20).map(|_| {
        let router = app.router.clone();
        async move { send(&router, post_json(EVALUATE, &trade("u15", 1000.0))).await }
    });

    let responses = futures_util::future::join_all(requests).await;
    let approved = responses
        .iter()
        .filter(|(status, body)| *status == StatusCode::OK && body["approved"] == true)
        .count();
    assert_eq!(approved, 10);

    let (_, body) = send(&app.router, get("/api/v1/risk/user-limits/u15")).await;
    assert_eq!(body["daily_traded"].as_f64(), Some(10000.0));
}
