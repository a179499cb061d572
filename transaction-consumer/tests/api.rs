mod common;

use axum::http::StatusCode;
use common_types::{Money, TransactionEvent, TransactionType};
use serde_json::{json, Value};
use uuid::Uuid;

use transaction_consumer::api::TransactionSearchResponse;

use common::{test_event, timestamp, MockStore, TestHarness};

fn seeded_store() -> (std::sync::Arc<MockStore>, Uuid) {
    let user = Uuid::new_v4();
    let events = vec![
        TransactionEvent::new(user, TransactionType::Bet, Money::from_minor(1000), timestamp(1)),
        TransactionEvent::new(user, TransactionType::Win, Money::from_minor(2500), timestamp(2)),
        TransactionEvent::new(user, TransactionType::Bet, Money::from_minor(500), timestamp(3)),
        test_event(4),
    ];
    (MockStore::with_events(events), user)
}

#[tokio::test]
async fn test_health_routes() {
    let harness = TestHarness::new(MockStore::new());

    assert_eq!(harness.get("/").await.status(), StatusCode::OK);
    assert_eq!(harness.get("/_liveness").await.status(), StatusCode::OK);
    assert_eq!(harness.get("/_readiness").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readiness_fails_when_store_is_down() {
    let harness = TestHarness::new(MockStore::unhealthy());

    let response = harness.get("/_readiness").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_search_by_user_returns_newest_first() {
    let (store, user) = seeded_store();
    let harness = TestHarness::new(store);

    let body = json!({ "user_id": user.to_string(), "transaction_type": "all" }).to_string();
    let response = harness.post("/transactions", &body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response: TransactionSearchResponse = TestHarness::body_json(response).await;
    assert_eq!(response.total, 3);
    assert_eq!(response.limit, 0);
    assert_eq!(response.offset, 0);
    let amounts: Vec<f64> = response.transactions.iter().map(|t| t.amount).collect();
    assert_eq!(amounts, vec![5.0, 25.0, 10.0]);
    assert!(response.transactions.iter().all(|t| t.user_id == user));
}

#[tokio::test]
async fn test_search_by_type_and_amount() {
    let (store, user) = seeded_store();
    let harness = TestHarness::new(store);

    let body = json!({
        "user_id": user.to_string(),
        "transaction_type": "bet",
        "amount_from": 6.0,
        "amount_to": 100.0,
    })
    .to_string();
    let response = harness.post("/transactions", &body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response: TransactionSearchResponse = TestHarness::body_json(response).await;
    assert_eq!(response.total, 1);
    assert_eq!(response.transactions[0].amount, 10.0);
    assert_eq!(response.transactions[0].transaction_type, TransactionType::Bet);
}

#[tokio::test]
async fn test_search_echoes_paging() {
    let (store, _) = seeded_store();
    let harness = TestHarness::new(store);

    let body = json!({ "limit": 2, "offset": 1 }).to_string();
    let response = harness.post("/transactions", &body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response: TransactionSearchResponse = TestHarness::body_json(response).await;
    assert_eq!(response.total, 2);
    assert_eq!(response.limit, 2);
    assert_eq!(response.offset, 1);
}

#[tokio::test]
async fn test_invalid_filter_is_bad_request() {
    let harness = TestHarness::new(MockStore::new());

    let response = harness
        .post("/transactions", &json!({ "user_id": "nope" }).to_string())
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = TestHarness::body_json(response).await;
    assert_eq!(body["error"], "Invalid filter parameters");
    assert!(body["message"].as_str().unwrap().contains("user_id"));

    let response = harness
        .post(
            "/transactions",
            &json!({ "transaction_type": "deposit" }).to_string(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let harness = TestHarness::new(MockStore::new());

    let response = harness.post("/transactions", "{not json").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_store_failure_is_internal_error() {
    let harness = TestHarness::new(MockStore::unhealthy());

    let response = harness.post("/transactions", "{}").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = TestHarness::body_json(response).await;
    assert_eq!(body["error"], "Failed to search transactions");
}
