//! Sessions, accounting log, profiles, dashboard stats and health.

use super::{page_window, ApiError, ApiState, Paged};
use crate::store::{AccountingRecord, NewProfile, Profile, Session};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

pub async fn sessions(State(state): State<ApiState>) -> Result<Json<Vec<Session>>, ApiError> {
    Ok(Json(state.store.active_sessions().await?))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn accounting(
    State(state): State<ApiState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paged<AccountingRecord>>, ApiError> {
    let (page, limit) = page_window(query.page, query.limit);
    let (items, total) = state.store.list_accounting(page, limit).await?;
    Ok(Json(Paged {
        items,
        total,
        page,
        limit,
    }))
}

pub async fn profiles(State(state): State<ApiState>) -> Result<Json<Vec<Profile>>, ApiError> {
    Ok(Json(state.store.list_profiles().await?))
}

pub async fn create_profile(
    State(state): State<ApiState>,
    Json(body): Json<NewProfile>,
) -> Result<Json<Profile>, ApiError> {
    if body.name.is_empty() {
        return Err(ApiError::BadRequest("profile name is required".to_string()));
    }
    Ok(Json(state.store.create_profile(body).await?))
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    #[serde(flatten)]
    pub counters: crate::store::Stats,
    pub server_status: &'static str,
}

pub async fn stats(State(state): State<ApiState>) -> Result<Json<DashboardStats>, ApiError> {
    let counters = state.store.stats().await?;
    Ok(Json(DashboardStats {
        counters,
        server_status: "running",
    }))
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

pub async fn health(State(state): State<ApiState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}
