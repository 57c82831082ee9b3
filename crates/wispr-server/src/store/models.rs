//! Row types for the SQLite store. Serialized straight into the admin
//! API's JSON responses, so secret material is explicitly skipped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Subscriber account. The NT hash is always kept; the cleartext
/// password only when `store_cleartext` was opted into (CHAP needs it,
/// the MS-CHAP family does not).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    #[serde(skip_serializing)]
    pub nt_hash: String,
    pub store_cleartext: bool,
    pub is_active: bool,
    pub profile: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(default = "default_true")]
    pub store_cleartext: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub password: Option<String>,
    pub store_cleartext: Option<bool>,
    pub is_active: Option<bool>,
    pub profile: Option<String>,
    /// `Some(None)` clears the expiry
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

fn default_true() -> bool {
    true
}

fn default_profile() -> String {
    "default".to_string()
}

/// RADIUS client device, keyed by source IP
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NasClient {
    pub id: i64,
    pub ip_address: String,
    #[serde(skip_serializing)]
    pub secret: String,
    pub name: String,
    pub vendor: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewNas {
    pub ip_address: String,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_vendor")]
    pub vendor: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NasUpdate {
    pub secret: Option<String>,
    pub name: Option<String>,
    pub vendor: Option<String>,
    pub is_active: Option<bool>,
}

fn default_vendor() -> String {
    "mikrotik".to_string()
}

/// Named attribute bundle referenced from `User.profile`
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    /// Vendor-formatted rate string, e.g. `10M/10M`
    pub rate_limit: Option<String>,
    pub session_timeout: Option<i64>,
    pub idle_timeout: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProfile {
    pub name: String,
    #[serde(default)]
    pub rate_limit: Option<String>,
    #[serde(default)]
    pub session_timeout: Option<i64>,
    #[serde(default)]
    pub idle_timeout: Option<i64>,
}

/// Live or finished session, keyed by Acct-Session-Id
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Session {
    pub id: i64,
    pub session_id: String,
    pub username: String,
    pub nas_ip: String,
    pub framed_ip: Option<String>,
    pub mac_address: Option<String>,
    pub start_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    pub stop_time: Option<DateTime<Utc>>,
    pub session_time: i64,
    pub input_octets: i64,
    pub output_octets: i64,
    pub terminate_cause: Option<String>,
}

/// Append-only accounting event row, one per Accounting-Request
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AccountingRecord {
    pub id: i64,
    pub session_id: String,
    pub username: String,
    pub nas_ip: String,
    pub status_type: i64,
    pub session_time: i64,
    pub input_octets: i64,
    pub output_octets: i64,
    pub framed_ip: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Dashboard console account (bcrypt, never a RADIUS principal)
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Dashboard counters
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub total_users: i64,
    pub active_users: i64,
    pub total_nas: i64,
    pub active_sessions: i64,
    pub today_input_octets: i64,
    pub today_output_octets: i64,
}
