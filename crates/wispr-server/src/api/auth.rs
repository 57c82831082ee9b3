//! Login exchange and bearer-token middleware.
//!
//! Tokens are HS256 JWTs carrying `{sub: admin_id, username, role, exp}`
//! with a 24 h TTL, signed with the symmetric `JWT_SECRET`.

use super::{ApiError, ApiState};
use crate::store::Admin;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum::{Extension, Json};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

const TOKEN_TTL_HOURS: i64 = 24;

pub struct AuthContext {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Admin row id
    pub sub: i64,
    pub username: String,
    pub role: String,
    /// Expiry, seconds since epoch
    pub exp: i64,
}

impl AuthContext {
    pub fn new(secret: &str) -> Self {
        AuthContext {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, admin: &Admin) -> Result<String, ApiError> {
        let claims = Claims {
            sub: admin.id,
            username: admin.username.clone(),
            role: admin.role.clone(),
            exp: (Utc::now() + chrono::Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|e| {
            error!(error = %e, "token signing failed");
            ApiError::Internal
        })
    }

    /// `None` for anything not signed by us or already expired
    pub fn verify(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .ok()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: Admin,
}

pub async fn login(
    State(state): State<ApiState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let admin = state
        .store
        .admin_by_username(&body.username)
        .await
        .map_err(|e| {
            error!(error = %e, "admin lookup failed");
            ApiError::Internal
        })?
        .ok_or_else(|| {
            warn!(username = %body.username, "login for unknown admin");
            ApiError::Unauthorized
        })?;

    let valid = bcrypt::verify(&body.password, &admin.password_hash).unwrap_or(false);
    if !valid {
        warn!(username = %body.username, "login with wrong password");
        return Err(ApiError::Unauthorized);
    }

    let token = state.tokens.issue(&admin)?;
    Ok(Json(LoginResponse { token, user: admin }))
}

pub async fn me(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Admin>, ApiError> {
    let admin = state.store.admin_by_id(claims.sub).await?;
    Ok(Json(admin))
}

/// Layer guarding every route except login and health. On success the
/// verified claims ride along in request extensions.
pub async fn require_bearer(
    State(state): State<ApiState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let claims = state.tokens.verify(token).ok_or(ApiError::Unauthorized)?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
