//! Subscriber CRUD.

use super::{page_window, ApiError, ApiState, Paged};
use crate::store::{NewUser, User, UserUpdate};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::error;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

pub async fn list(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Paged<User>>, ApiError> {
    let (page, limit) = page_window(query.page, query.limit);
    let (items, total) = state
        .store
        .list_users(page, limit, query.search.as_deref())
        .await
        .map_err(|e| {
            error!(error = %e, "user listing failed");
            ApiError::from(e)
        })?;
    Ok(Json(Paged {
        items,
        total,
        page,
        limit,
    }))
}

pub async fn get_one(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.store.user_by_id(id).await?))
}

pub async fn create(
    State(state): State<ApiState>,
    Json(body): Json<NewUser>,
) -> Result<Json<User>, ApiError> {
    if body.username.is_empty() {
        return Err(ApiError::BadRequest("username is required".to_string()));
    }
    if body.password.is_empty() {
        return Err(ApiError::BadRequest("password is required".to_string()));
    }
    let user = state.store.create_user(body).await?;
    Ok(Json(user))
}

pub async fn update(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(body): Json<UserUpdate>,
) -> Result<Json<User>, ApiError> {
    if body.password.as_deref() == Some("") {
        return Err(ApiError::BadRequest("password cannot be empty".to_string()));
    }
    Ok(Json(state.store.update_user(id, body).await?))
}

pub async fn remove(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.delete_user(id).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}
