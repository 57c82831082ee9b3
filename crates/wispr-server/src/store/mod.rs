//! SQLite-backed store owning every persisted row: subscribers, NAS
//! clients, profiles, sessions, the append-only accounting log and
//! dashboard admins.
//!
//! One pool, WAL journal mode, schema applied idempotently at startup.
//! Every method is atomic per call; handlers never hold transactions
//! across await points. Concurrent session upserts are resolved by the
//! `sessions.session_id` unique index (`ON CONFLICT DO UPDATE`), not by
//! application locks.

mod models;

pub use models::{
    AccountingRecord, Admin, NasClient, NasUpdate, NewNas, NewProfile, NewUser, Profile, Session,
    Stats, User, UserUpdate,
};

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(sqlx::Error),
    #[error("not found")]
    NotFound,
    #[error("{0} already exists")]
    Conflict(&'static str),
    #[error("password hash error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            other => StoreError::Db(other),
        }
    }
}

/// Map a unique-index violation onto a caller-supplied conflict label
fn or_conflict(err: sqlx::Error, what: &'static str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(what),
        _ => StoreError::from(err),
    }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    username        TEXT NOT NULL UNIQUE,
    password        TEXT,
    nt_hash         TEXT NOT NULL,
    store_cleartext INTEGER NOT NULL DEFAULT 1,
    is_active       INTEGER NOT NULL DEFAULT 1,
    profile         TEXT NOT NULL DEFAULT 'default',
    expires_at      TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS nas_clients (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    ip_address TEXT NOT NULL UNIQUE,
    secret     TEXT NOT NULL,
    name       TEXT NOT NULL DEFAULT '',
    vendor     TEXT NOT NULL DEFAULT 'mikrotik',
    is_active  INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS profiles (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL UNIQUE,
    rate_limit      TEXT,
    session_timeout INTEGER,
    idle_timeout    INTEGER
);

CREATE TABLE IF NOT EXISTS sessions (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id      TEXT NOT NULL UNIQUE,
    username        TEXT NOT NULL,
    nas_ip          TEXT NOT NULL,
    framed_ip       TEXT,
    mac_address     TEXT,
    start_time      TEXT NOT NULL,
    update_time     TEXT NOT NULL,
    stop_time       TEXT,
    session_time    INTEGER NOT NULL DEFAULT 0,
    input_octets    INTEGER NOT NULL DEFAULT 0,
    output_octets   INTEGER NOT NULL DEFAULT 0,
    terminate_cause TEXT
);

CREATE TABLE IF NOT EXISTS accounting (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id    TEXT NOT NULL,
    username      TEXT NOT NULL,
    nas_ip        TEXT NOT NULL,
    status_type   INTEGER NOT NULL,
    session_time  INTEGER NOT NULL DEFAULT 0,
    input_octets  INTEGER NOT NULL DEFAULT 0,
    output_octets INTEGER NOT NULL DEFAULT 0,
    framed_ip     TEXT,
    timestamp     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS admins (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL DEFAULT 'admin',
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_stop_time ON sessions(stop_time);
CREATE INDEX IF NOT EXISTS idx_accounting_timestamp ON accounting(timestamp);
CREATE INDEX IF NOT EXISTS idx_accounting_session ON accounting(session_id);
"#;

#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if missing) the database file and apply the schema
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let store = Store { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Private in-memory database, used by the test suites
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(sqlx::Error::from)?;
        // A second connection would see a different empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let store = Store { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// First-boot seeding: the `default` profile and one admin account.
    /// Safe to call on every startup.
    pub async fn seed(&self, admin_username: &str, admin_password: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT OR IGNORE INTO profiles (name) VALUES ('default')")
            .execute(&self.pool)
            .await?;

        if self.admin_by_username(admin_username).await?.is_none() {
            let hash = bcrypt::hash(admin_password, bcrypt::DEFAULT_COST)?;
            sqlx::query(
                "INSERT OR IGNORE INTO admins (username, password_hash, role, created_at)
                 VALUES (?, ?, 'admin', ?)",
            )
            .bind(admin_username)
            .bind(hash)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
            info!(username = %admin_username, "seeded admin account");
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ---- users ----

    pub async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let now = Utc::now();
        let nt_hash = hex::encode(wispr_proto::nt_password_hash(&new.password));
        let cleartext = new.store_cleartext.then_some(new.password.as_str());
        let id = sqlx::query(
            "INSERT INTO users
                (username, password, nt_hash, store_cleartext, is_active, profile, expires_at,
                 created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&new.username)
        .bind(cleartext)
        .bind(&nt_hash)
        .bind(new.store_cleartext)
        .bind(new.is_active)
        .bind(&new.profile)
        .bind(new.expires_at)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| or_conflict(e, "username"))?
        .last_insert_rowid();

        self.user_by_id(id).await
    }

    pub async fn user_by_id(&self, id: i64) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    pub async fn user_by_name(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    pub async fn list_users(
        &self,
        page: i64,
        limit: i64,
        search: Option<&str>,
    ) -> Result<(Vec<User>, i64), StoreError> {
        let pattern = search.map(|s| format!("%{s}%"));
        let (users, total) = match &pattern {
            Some(p) => {
                let users = sqlx::query_as::<_, User>(
                    "SELECT * FROM users WHERE username LIKE ?
                     ORDER BY username LIMIT ? OFFSET ?",
                )
                .bind(p)
                .bind(limit)
                .bind((page - 1) * limit)
                .fetch_all(&self.pool)
                .await?;
                let total: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username LIKE ?")
                        .bind(p)
                        .fetch_one(&self.pool)
                        .await?;
                (users, total)
            }
            None => {
                let users = sqlx::query_as::<_, User>(
                    "SELECT * FROM users ORDER BY username LIMIT ? OFFSET ?",
                )
                .bind(limit)
                .bind((page - 1) * limit)
                .fetch_all(&self.pool)
                .await?;
                let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
                    .fetch_one(&self.pool)
                    .await?;
                (users, total)
            }
        };
        Ok((users, total))
    }

    pub async fn update_user(&self, id: i64, update: UserUpdate) -> Result<User, StoreError> {
        let mut user = self.user_by_id(id).await?;

        if let Some(store_cleartext) = update.store_cleartext {
            user.store_cleartext = store_cleartext;
        }
        if let Some(password) = update.password {
            user.nt_hash = hex::encode(wispr_proto::nt_password_hash(&password));
            user.password = user.store_cleartext.then_some(password);
        } else if !user.store_cleartext {
            user.password = None;
        }
        if let Some(is_active) = update.is_active {
            user.is_active = is_active;
        }
        if let Some(profile) = update.profile {
            user.profile = profile;
        }
        if let Some(expires_at) = update.expires_at {
            user.expires_at = expires_at;
        }

        sqlx::query(
            "UPDATE users SET password = ?, nt_hash = ?, store_cleartext = ?, is_active = ?,
                 profile = ?, expires_at = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&user.password)
        .bind(&user.nt_hash)
        .bind(user.store_cleartext)
        .bind(user.is_active)
        .bind(&user.profile)
        .bind(user.expires_at)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.user_by_id(id).await
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ---- NAS clients ----

    pub async fn create_nas(&self, new: NewNas, default_secret: &str) -> Result<NasClient, StoreError> {
        let secret = new.secret.as_deref().unwrap_or(default_secret);
        let id = sqlx::query(
            "INSERT INTO nas_clients (ip_address, secret, name, vendor, is_active, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&new.ip_address)
        .bind(secret)
        .bind(&new.name)
        .bind(&new.vendor)
        .bind(new.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| or_conflict(e, "ip_address"))?
        .last_insert_rowid();

        self.nas_by_id(id).await
    }

    pub async fn nas_by_id(&self, id: i64) -> Result<NasClient, StoreError> {
        sqlx::query_as::<_, NasClient>("SELECT * FROM nas_clients WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    /// Active NAS for a source address; inactive records are invisible
    /// here, so the transport treats them as unknown.
    pub async fn nas_by_ip(&self, ip: &str) -> Result<Option<NasClient>, StoreError> {
        Ok(sqlx::query_as::<_, NasClient>(
            "SELECT * FROM nas_clients WHERE ip_address = ? AND is_active = 1",
        )
        .bind(ip)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn list_nas(&self) -> Result<Vec<NasClient>, StoreError> {
        Ok(
            sqlx::query_as::<_, NasClient>("SELECT * FROM nas_clients ORDER BY ip_address")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    pub async fn update_nas(&self, id: i64, update: NasUpdate) -> Result<NasClient, StoreError> {
        let mut nas = self.nas_by_id(id).await?;
        if let Some(secret) = update.secret {
            nas.secret = secret;
        }
        if let Some(name) = update.name {
            nas.name = name;
        }
        if let Some(vendor) = update.vendor {
            nas.vendor = vendor;
        }
        if let Some(is_active) = update.is_active {
            nas.is_active = is_active;
        }

        sqlx::query(
            "UPDATE nas_clients SET secret = ?, name = ?, vendor = ?, is_active = ? WHERE id = ?",
        )
        .bind(&nas.secret)
        .bind(&nas.name)
        .bind(&nas.vendor)
        .bind(nas.is_active)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(nas)
    }

    pub async fn delete_nas(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM nas_clients WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ---- profiles ----

    pub async fn list_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        Ok(
            sqlx::query_as::<_, Profile>("SELECT * FROM profiles ORDER BY name")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    pub async fn create_profile(&self, new: NewProfile) -> Result<Profile, StoreError> {
        let id = sqlx::query(
            "INSERT INTO profiles (name, rate_limit, session_timeout, idle_timeout)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&new.name)
        .bind(&new.rate_limit)
        .bind(new.session_timeout)
        .bind(new.idle_timeout)
        .execute(&self.pool)
        .await
        .map_err(|e| or_conflict(e, "profile name"))?
        .last_insert_rowid();

        sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    /// Dangling `User.profile` references resolve to `None`; the auth
    /// handler then emits no profile attributes.
    pub async fn profile_by_name(&self, name: &str) -> Result<Option<Profile>, StoreError> {
        Ok(
            sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    // ---- sessions ----

    /// Acct Start: insert the session, or revive the row when the NAS
    /// reuses a session id (stop_time cleared, start_time reset, byte
    /// counters kept). The unique index arbitrates concurrent inserts.
    pub async fn start_session(
        &self,
        session_id: &str,
        username: &str,
        nas_ip: &str,
        framed_ip: Option<&str>,
        mac_address: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sessions
                (session_id, username, nas_ip, framed_ip, mac_address, start_time, update_time)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(session_id) DO UPDATE SET
                username = excluded.username,
                nas_ip = excluded.nas_ip,
                framed_ip = excluded.framed_ip,
                mac_address = excluded.mac_address,
                start_time = excluded.start_time,
                update_time = excluded.update_time,
                stop_time = NULL,
                terminate_cause = NULL",
        )
        .bind(session_id)
        .bind(username)
        .bind(nas_ip)
        .bind(framed_ip)
        .bind(mac_address)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Acct Interim-Update: push counters forward, creating the session
    /// when the Start never arrived. Counters never move backwards.
    #[allow(clippy::too_many_arguments)]
    pub async fn interim_session(
        &self,
        session_id: &str,
        username: &str,
        nas_ip: &str,
        framed_ip: Option<&str>,
        session_time: i64,
        input_octets: i64,
        output_octets: i64,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sessions
                (session_id, username, nas_ip, framed_ip, start_time, update_time,
                 session_time, input_octets, output_octets)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(session_id) DO UPDATE SET
                update_time = excluded.update_time,
                framed_ip = COALESCE(excluded.framed_ip, sessions.framed_ip),
                session_time = MAX(sessions.session_time, excluded.session_time),
                input_octets = MAX(sessions.input_octets, excluded.input_octets),
                output_octets = MAX(sessions.output_octets, excluded.output_octets)",
        )
        .bind(session_id)
        .bind(username)
        .bind(nas_ip)
        .bind(framed_ip)
        .bind(now)
        .bind(now)
        .bind(session_time)
        .bind(input_octets)
        .bind(output_octets)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Acct Stop: final counters, stop_time and terminate cause. A
    /// duplicate Stop repeats the same update and is a no-op in effect.
    #[allow(clippy::too_many_arguments)]
    pub async fn stop_session(
        &self,
        session_id: &str,
        username: &str,
        nas_ip: &str,
        session_time: i64,
        input_octets: i64,
        output_octets: i64,
        terminate_cause: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sessions
                (session_id, username, nas_ip, start_time, update_time, stop_time,
                 session_time, input_octets, output_octets, terminate_cause)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(session_id) DO UPDATE SET
                update_time = excluded.update_time,
                stop_time = excluded.stop_time,
                session_time = MAX(sessions.session_time, excluded.session_time),
                input_octets = MAX(sessions.input_octets, excluded.input_octets),
                output_octets = MAX(sessions.output_octets, excluded.output_octets),
                terminate_cause = excluded.terminate_cause",
        )
        .bind(session_id)
        .bind(username)
        .bind(nas_ip)
        .bind(now)
        .bind(now)
        .bind(now)
        .bind(session_time)
        .bind(input_octets)
        .bind(output_octets)
        .bind(terminate_cause)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn session_by_id(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        Ok(
            sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE session_id = ?")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    pub async fn active_sessions(&self) -> Result<Vec<Session>, StoreError> {
        Ok(sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE stop_time IS NULL ORDER BY start_time DESC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    // ---- accounting log ----

    /// One append per Accounting-Request, regardless of status type
    #[allow(clippy::too_many_arguments)]
    pub async fn append_accounting(
        &self,
        session_id: &str,
        username: &str,
        nas_ip: &str,
        status_type: u32,
        session_time: i64,
        input_octets: i64,
        output_octets: i64,
        framed_ip: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO accounting
                (session_id, username, nas_ip, status_type, session_time,
                 input_octets, output_octets, framed_ip, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(username)
        .bind(nas_ip)
        .bind(status_type as i64)
        .bind(session_time)
        .bind(input_octets)
        .bind(output_octets)
        .bind(framed_ip)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_accounting(
        &self,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<AccountingRecord>, i64), StoreError> {
        let records = sqlx::query_as::<_, AccountingRecord>(
            "SELECT * FROM accounting ORDER BY id DESC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounting")
            .fetch_one(&self.pool)
            .await?;
        Ok((records, total))
    }

    // ---- admins ----

    pub async fn admin_by_username(&self, username: &str) -> Result<Option<Admin>, StoreError> {
        Ok(
            sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    pub async fn admin_by_id(&self, id: i64) -> Result<Admin, StoreError> {
        sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    // ---- dashboard ----

    pub async fn stats(&self) -> Result<Stats, StoreError> {
        let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let active_users: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active = 1")
                .fetch_one(&self.pool)
                .await?;
        let total_nas: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM nas_clients")
            .fetch_one(&self.pool)
            .await?;
        let active_sessions: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE stop_time IS NULL")
                .fetch_one(&self.pool)
                .await?;
        let (today_input_octets, today_output_octets): (i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(input_octets), 0), COALESCE(SUM(output_octets), 0)
             FROM accounting
             WHERE date(timestamp, 'localtime') = date('now', 'localtime')",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(Stats {
            total_users,
            active_users,
            total_nas,
            active_sessions,
            today_input_octets,
            today_output_octets,
        })
    }
}
