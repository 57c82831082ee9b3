//! Admin API flows driven through the router: login exchange, bearer
//! enforcement, CRUD surfaces and the error body contract.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceExt;
use wispr_server::api::{self, ApiState, AuthContext};
use wispr_server::Store;

async fn test_router() -> (Router, Arc<Store>) {
    let store = Arc::new(Store::open_in_memory().await.unwrap());
    store.seed("admin", "admin123").await.unwrap();
    let state = ApiState {
        store: Arc::clone(&store),
        tokens: Arc::new(AuthContext::new("test-jwt-secret")),
        started_at: Instant::now(),
        default_secret: "testing123".to_string(),
    };
    (api::router(state), store)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json");
    match body {
        Some(value) => builder.body(Body::from(value.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn login(router: &Router) -> String {
    let response = router
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            json!({"username": "admin", "password": "admin123"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["username"], "admin");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn login_issues_token_and_me_roundtrips() {
    let (router, _) = test_router().await;
    let token = login(&router).await;

    let response = router
        .clone()
        .oneshot(authed("GET", "/api/auth/me", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["username"], "admin");
    assert_eq!(body["role"], "admin");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let (router, _) = test_router().await;
    let response = router
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            json!({"username": "admin", "password": "nope"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn missing_or_garbage_token_is_401() {
    let (router, _) = test_router().await;

    let bare = Request::builder()
        .uri("/api/users")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(bare).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .clone()
        .oneshot(authed("GET", "/api/users", "not-a-jwt", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_is_open() {
    let (router, _) = test_router().await;
    let response = router
        .clone()
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
    assert!(body["uptime_seconds"].is_number());
}

#[tokio::test]
async fn user_crud_over_http() {
    let (router, _) = test_router().await;
    let token = login(&router).await;

    let response = router
        .clone()
        .oneshot(authed(
            "POST",
            "/api/users",
            &token,
            Some(json!({"username": "alice", "password": "wonderland"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(response).await;
    assert_eq!(created["username"], "alice");
    assert_eq!(created["profile"], "default");
    assert!(created.get("password").is_none());
    assert!(created.get("nt_hash").is_none());
    let id = created["id"].as_i64().unwrap();

    // Duplicate username is a 400 with a message
    let response = router
        .clone()
        .oneshot(authed(
            "POST",
            "/api/users",
            &token,
            Some(json!({"username": "alice", "password": "other"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("already exists"));

    let response = router
        .clone()
        .oneshot(authed(
            "PUT",
            &format!("/api/users/{id}"),
            &token,
            Some(json!({"is_active": false})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["is_active"], false);

    let response = router
        .clone()
        .oneshot(authed(
            "GET",
            "/api/users?page=1&limit=10&search=ali",
            &token,
            None,
        ))
        .await
        .unwrap();
    let listing = body_json(response).await;
    assert_eq!(listing["total"], 1);
    assert_eq!(listing["items"][0]["username"], "alice");

    let response = router
        .clone()
        .oneshot(authed("DELETE", &format!("/api/users/{id}"), &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(authed("GET", &format!("/api/users/{id}"), &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn nas_create_validates_ip_and_uniqueness() {
    let (router, _) = test_router().await;
    let token = login(&router).await;

    let response = router
        .clone()
        .oneshot(authed(
            "POST",
            "/api/nas",
            &token,
            Some(json!({"ip_address": "not-an-ip"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .clone()
        .oneshot(authed(
            "POST",
            "/api/nas",
            &token,
            Some(json!({"ip_address": "10.0.0.1", "name": "ap-1"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let nas = body_json(response).await;
    assert_eq!(nas["vendor"], "mikrotik");
    assert!(nas.get("secret").is_none());

    let response = router
        .clone()
        .oneshot(authed(
            "POST",
            "/api/nas",
            &token,
            Some(json!({"ip_address": "10.0.0.1"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profiles_sessions_accounting_and_stats() {
    let (router, store) = test_router().await;
    let token = login(&router).await;

    let response = router
        .clone()
        .oneshot(authed(
            "POST",
            "/api/profiles",
            &token,
            Some(json!({"name": "premium", "rate_limit": "10M/10M", "session_timeout": 3600})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(authed("GET", "/api/profiles", &token, None))
        .await
        .unwrap();
    let profiles = body_json(response).await;
    // "default" seeded plus the one just created
    assert_eq!(profiles.as_array().unwrap().len(), 2);

    let now = chrono::Utc::now();
    store
        .start_session("S1", "alice", "10.0.0.1", None, None, now)
        .await
        .unwrap();
    store
        .append_accounting("S1", "alice", "10.0.0.1", 1, 0, 1500, 300, None, now)
        .await
        .unwrap();

    let response = router
        .clone()
        .oneshot(authed("GET", "/api/sessions", &token, None))
        .await
        .unwrap();
    let sessions = body_json(response).await;
    assert_eq!(sessions.as_array().unwrap().len(), 1);
    assert_eq!(sessions[0]["session_id"], "S1");

    let response = router
        .clone()
        .oneshot(authed("GET", "/api/accounting?page=1&limit=5", &token, None))
        .await
        .unwrap();
    let log = body_json(response).await;
    assert_eq!(log["total"], 1);

    let response = router
        .clone()
        .oneshot(authed("GET", "/api/dashboard/stats", &token, None))
        .await
        .unwrap();
    let stats = body_json(response).await;
    assert_eq!(stats["server_status"], "running");
    assert_eq!(stats["active_sessions"], 1);
    assert_eq!(stats["today_input_octets"], 1500);
}
