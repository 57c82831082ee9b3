//! wisprd: a lightweight RADIUS server for small-scale access networks.
//!
//! Built on `wispr-proto` for the wire protocol, this crate adds the
//! daemon: environment-driven configuration, a SQLite store for users,
//! NAS clients, profiles, sessions and the accounting log, UDP listeners
//! for authentication (1812) and accounting (1813), and a
//! token-authenticated admin HTTP API.

pub mod acct_handler;
pub mod api;
pub mod auth_handler;
pub mod config;
pub mod server;
pub mod store;

pub use acct_handler::AcctHandler;
pub use api::{ApiState, AuthContext};
pub use auth_handler::AuthHandler;
pub use config::{Config, ConfigError};
pub use server::{RadiusServer, ServerError};
pub use store::{Store, StoreError};
