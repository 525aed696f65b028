//! Integration tests for the HTTP entrypoint
//!
//! Upstream APIs are mocked with wiremock; the router is driven with
//! `tower::ServiceExt::oneshot`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use leadsync_engine::{IdempotencyTracker, SqliteStore, SyncConfig};
use leadsync_server::{config::CorsConfig, create_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn app_with_tracker(upstream: &str, tracker: IdempotencyTracker) -> Router {
    let sync = SyncConfig {
        source_base_url: upstream.to_string(),
        destination_base_url: upstream.to_string(),
        ..SyncConfig::default()
    };
    let cors = CorsConfig {
        allowed_origins: vec!["https://app.example.com".to_string()],
        allow_credentials: true,
    };
    create_router(AppState::new(sync, tracker), &cors)
}

fn app(upstream: &str) -> Router {
    app_with_tracker(upstream, IdempotencyTracker::disabled())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn mount_happy_path(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/lead-lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lead_lists": [{"id": "1", "name": "VPs"}, {"id": "2", "name": "Unmapped"}]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/campaigns"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "9", "name": "vps"}
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/lead-lists/1/leads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "leads": [
                {"email": "a@acme.io"},
                {"email": "b@acme.io"},
                {"first_name": "No email"}
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_health() {
    let response = app("http://127.0.0.1:9")
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["dedup"], false);
}

#[tokio::test]
async fn test_get_sync_is_method_not_allowed() {
    let response = app("http://127.0.0.1:9")
        .oneshot(Request::builder().uri("/sync").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_sync_without_tokens_is_bad_request() {
    let server = MockServer::start().await;

    let response = app(&server.uri())
        .oneshot(post_json("/sync", json!({"sourceToken": "only-one"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["message"], "Missing required tokens");
    assert_eq!(body["error"]["status"], 400);

    // Rejected before any upstream call
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/sync")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app("http://127.0.0.1:9").oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sync_returns_run_report() {
    let server = MockServer::start().await;
    mount_happy_path(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/lead/add"))
        .and(query_param("api_key", "in-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(&server.uri())
        .oneshot(post_json(
            "/sync",
            json!({"amplemarketToken": "am-token", "instantlyToken": "in-token"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["totalLeads"], 2);
    assert_eq!(body["processed"][0]["listName"], "VPs");
    assert_eq!(body["processed"][0]["campaignId"], "9");
    assert_eq!(body["processed"][0]["rejectedCount"], 1);
    assert_eq!(body["skipped"][0]["reason"], "No matching destination");
    assert_eq!(body["debug"]["campaignsCount"], 1);
}

#[tokio::test]
async fn test_second_sync_with_store_skips_processed_list() {
    let server = MockServer::start().await;
    mount_happy_path(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v1/lead/add"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    let tracker = IdempotencyTracker::new(
        Arc::new(SqliteStore::in_memory().unwrap()),
        SyncConfig::default().retention(),
    );
    let app = app_with_tracker(&server.uri(), tracker);
    let tokens = json!({"sourceToken": "am-token", "destinationToken": "in-token"});

    let first = app.clone().oneshot(post_json("/sync", tokens.clone())).await.unwrap();
    assert_eq!(json_body(first).await["totalLeads"], 2);

    let second = json_body(app.oneshot(post_json("/sync", tokens)).await.unwrap()).await;
    assert_eq!(second["totalLeads"], 0);
    let skipped: Vec<&str> = second["skipped"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["reason"].as_str().unwrap())
        .collect();
    assert!(skipped.contains(&"Already processed"));
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lead-lists"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .mount(&server)
        .await;

    let response = app(&server.uri())
        .oneshot(post_json(
            "/sync",
            json!({"sourceToken": "bad", "destinationToken": "in-token"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("401 - invalid token"));
}

#[tokio::test]
async fn test_debug_probes_requested_api_only() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/campaigns"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "9", "name": "vps"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(&server.uri())
        .oneshot(post_json(
            "/debug",
            json!({
                "sourceToken": "am-token",
                "destinationToken": "in-token",
                "action": "test-destination"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body.get("source").is_none());
    assert_eq!(body["destination"]["success"], true);
    assert_eq!(body["destination"]["itemsCount"], 1);
    assert_eq!(body["destination"]["responseStructure"]["isArray"], true);
    assert_eq!(body["tokenHints"]["destinationToken"], "in-to...");
}

#[tokio::test]
async fn test_cors_preflight() {
    let response = app("http://127.0.0.1:9")
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/sync")
                .header(header::ORIGIN, "https://app.example.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "https://app.example.com"
    );
}
