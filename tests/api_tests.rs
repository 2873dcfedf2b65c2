use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use reco_api::api::{create_router, AppState};
use reco_api::models::{EventType, Product, RecommendationsResponse};
use reco_api::services::InMemoryStore;

fn create_test_server(store: InMemoryStore) -> TestServer {
    let state = AppState::from_store(Arc::new(store), Duration::from_secs(1));
    let app = create_router(state, None);
    TestServer::new(app).unwrap()
}

fn product(name: &str, age_days: i64) -> Product {
    let mut product = Product::new(name, 50_000, 10);
    product.created_at = Utc::now() - chrono::Duration::days(age_days);
    product
}

/// A catalog where "me" viewed A and three other sessions viewed A and B,
/// one of which also added C to the cart. D is popular but unrelated.
fn shop() -> (InMemoryStore, [Uuid; 4]) {
    let mut store = InMemoryStore::new();
    let a = store.add_product(product("A", 4));
    let b = store.add_product(product("B", 3));
    let c = store.add_product(product("C", 2));
    let d = store.add_product(product("D", 1));

    store.record(EventType::ViewProduct, Some(a), None, Some("me"));
    for session in ["s1", "s2", "s3"] {
        store.record(EventType::ViewProduct, Some(a), None, Some(session));
        store.record(EventType::ViewProduct, Some(b), None, Some(session));
    }
    store.record(EventType::AddToCart, Some(c), None, Some("s1"));
    for _ in 0..10 {
        store.record(EventType::ViewProduct, Some(d), None, Some("crowd"));
    }

    (store, [a, b, c, d])
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server(InMemoryStore::new());
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_personalized_recommendations_for_session() {
    let (store, [a, b, c, _]) = shop();
    let server = create_test_server(store);

    let response = server
        .get("/recommendations")
        .add_query_param("session_id", "me")
        .add_query_param("limit", 2)
        .await;

    response.assert_status_ok();
    let body: RecommendationsResponse = response.json();
    let got: Vec<(Uuid, i64)> = body.items.iter().map(|i| (i.id, i.score)).collect();
    assert_eq!(got, vec![(b, 3), (c, 1)]);
    assert!(body.items.iter().all(|i| i.id != a));
    assert_eq!(body.items[0].name, "B");
    assert_eq!(body.items[0].price, 50_000);
}

#[tokio::test]
async fn test_unknown_shopper_gets_popular_products() {
    let (store, [a, b, _, d]) = shop();
    let server = create_test_server(store);

    let response = server
        .get("/recommendations")
        .add_query_param("user_id", "never-seen")
        .add_query_param("limit", 3)
        .await;

    response.assert_status_ok();
    let body: RecommendationsResponse = response.json();
    let got: Vec<(Uuid, i64)> = body.items.iter().map(|i| (i.id, i.score)).collect();
    assert_eq!(got, vec![(d, 10), (a, 4), (b, 3)]);
}

#[tokio::test]
async fn test_default_limit_is_six() {
    let mut store = InMemoryStore::new();
    for i in 0..10 {
        store.add_product(product(&format!("P{i}"), i));
    }
    let server = create_test_server(store);

    let response = server.get("/recommendations").await;

    response.assert_status_ok();
    let body: RecommendationsResponse = response.json();
    assert_eq!(body.items.len(), 6);
    assert!(body.items.iter().all(|i| i.score == 0));
}

#[tokio::test]
async fn test_blank_identity_is_treated_as_absent() {
    let (store, [_, _, _, d]) = shop();
    let server = create_test_server(store);

    let response = server
        .get("/recommendations")
        .add_query_param("user_id", "")
        .add_query_param("session_id", "")
        .add_query_param("limit", 1)
        .await;

    response.assert_status_ok();
    let body: RecommendationsResponse = response.json();
    assert_eq!(body.items.len(), 1);
    assert_eq!(body.items[0].id, d);
}

#[tokio::test]
async fn test_empty_catalog_returns_empty_items() {
    let server = create_test_server(InMemoryStore::new());

    let response = server
        .get("/recommendations")
        .add_query_param("session_id", "me")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["items"], serde_json::json!([]));
}

#[tokio::test]
async fn test_out_of_range_limit_is_rejected() {
    let server = create_test_server(InMemoryStore::new());

    for limit in ["0", "21", "abc"] {
        let response = server
            .get("/recommendations")
            .add_query_param("limit", limit)
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("limit"));
    }
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server(InMemoryStore::new());
    let id = Uuid::new_v4().to_string();

    let response = server
        .get("/health")
        .add_header(
            axum::http::HeaderName::from_static("x-request-id"),
            axum::http::HeaderValue::from_str(&id).unwrap(),
        )
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("x-request-id").to_str().unwrap(), id);
}
