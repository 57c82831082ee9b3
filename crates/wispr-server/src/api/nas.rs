//! NAS client CRUD. The IP address is the natural key; creating a
//! second record for the same address is a 400.

use super::{ApiError, ApiState};
use crate::store::{NasClient, NasUpdate, NewNas};
use axum::extract::{Path, State};
use axum::Json;
use std::net::IpAddr;

pub async fn list(State(state): State<ApiState>) -> Result<Json<Vec<NasClient>>, ApiError> {
    Ok(Json(state.store.list_nas().await?))
}

pub async fn get_one(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<NasClient>, ApiError> {
    Ok(Json(state.store.nas_by_id(id).await?))
}

pub async fn create(
    State(state): State<ApiState>,
    Json(body): Json<NewNas>,
) -> Result<Json<NasClient>, ApiError> {
    if body.ip_address.parse::<IpAddr>().is_err() {
        return Err(ApiError::BadRequest(format!(
            "invalid IP address: {}",
            body.ip_address
        )));
    }
    if body.secret.as_deref() == Some("") {
        return Err(ApiError::BadRequest("secret cannot be empty".to_string()));
    }
    let nas = state.store.create_nas(body, &state.default_secret).await?;
    Ok(Json(nas))
}

pub async fn update(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(body): Json<NasUpdate>,
) -> Result<Json<NasClient>, ApiError> {
    if body.secret.as_deref() == Some("") {
        return Err(ApiError::BadRequest("secret cannot be empty".to_string()));
    }
    Ok(Json(state.store.update_nas(id, body).await?))
}

pub async fn remove(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.delete_nas(id).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}
