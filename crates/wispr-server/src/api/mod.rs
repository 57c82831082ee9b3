//! Admin HTTP API: token-authenticated JSON over axum.
//!
//! `/api/auth/login` and `/api/health` are open; everything else wants
//! `Authorization: Bearer <token>`. Errors render as
//! `{"error": "<message>"}` with 400/401/404/500; store failures never
//! leak details to the client.

mod auth;
mod misc;
mod nas;
mod users;

pub use auth::AuthContext;

use crate::store::{Store, StoreError};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<Store>,
    pub tokens: Arc<AuthContext>,
    pub started_at: Instant,
    /// Secret for NAS records created without one
    pub default_secret: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    NotFound,
    Internal,
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound,
            StoreError::Conflict(what) => ApiError::BadRequest(format!("{what} already exists")),
            // Real cause goes to the log at the call site, not the client
            _ => ApiError::Internal,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Envelope for paginated listings
#[derive(Debug, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// Clamp user-supplied paging parameters
pub(crate) fn page_window(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(20).clamp(1, 100);
    (page, limit)
}

pub fn router(state: ApiState) -> Router {
    let protected = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/dashboard/stats", get(misc::stats))
        .route(
            "/api/users",
            get(users::list).post(users::create),
        )
        .route(
            "/api/users/:id",
            get(users::get_one).put(users::update).delete(users::remove),
        )
        .route("/api/nas", get(nas::list).post(nas::create))
        .route(
            "/api/nas/:id",
            get(nas::get_one).put(nas::update).delete(nas::remove),
        )
        .route("/api/sessions", get(misc::sessions))
        .route("/api/accounting", get(misc::accounting))
        .route("/api/profiles", get(misc::profiles).post(misc::create_profile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .route("/api/auth/login", axum::routing::post(auth::login))
        .route("/api/health", get(misc::health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
