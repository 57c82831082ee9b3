use serde::Serialize;
use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("invalid value for {var}: {value}")]
    BadEnv { var: String, value: String },
}

/// Server configuration, assembled from environment variables.
///
/// | Variable | Default |
/// |---|---|
/// | `RADIUS_AUTH_PORT` | 1812 |
/// | `RADIUS_ACCT_PORT` | 1813 |
/// | `DASHBOARD_PORT` | 8080 |
/// | `DATABASE_PATH` | `wisprd.db` |
/// | `DEFAULT_SECRET` | `testing123` |
/// | `ADMIN_USERNAME` | `admin` |
/// | `ADMIN_PASSWORD` | `admin123` |
/// | `JWT_SECRET` | development-only constant |
/// | `LOG_LEVEL` | `info` |
///
/// The value is built once in `main` and passed into constructors; there
/// is no process-wide configuration state.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub auth_port: u16,
    pub acct_port: u16,
    pub dashboard_port: u16,
    pub database_path: String,
    /// Shared secret assigned to NAS clients created without one
    pub default_secret: String,
    pub admin_username: String,
    #[serde(skip_serializing)]
    pub admin_password: String,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub log_level: String,
}

fn env_or(var: &str, default: &str) -> String {
    env::var(var).unwrap_or_else(|_| default.to_string())
}

fn env_port(var: &str, default: u16) -> Result<u16, ConfigError> {
    match env::var(var) {
        Ok(value) => value.parse().map_err(|_| ConfigError::BadEnv {
            var: var.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config {
            auth_port: env_port("RADIUS_AUTH_PORT", 1812)?,
            acct_port: env_port("RADIUS_ACCT_PORT", 1813)?,
            dashboard_port: env_port("DASHBOARD_PORT", 8080)?,
            database_path: env_or("DATABASE_PATH", "wisprd.db"),
            default_secret: env_or("DEFAULT_SECRET", "testing123"),
            admin_username: env_or("ADMIN_USERNAME", "admin"),
            admin_password: env_or("ADMIN_PASSWORD", "admin123"),
            jwt_secret: env_or("JWT_SECRET", "wisprd-insecure-dev-secret"),
            log_level: env_or("LOG_LEVEL", "info"),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth_port == 0 || self.acct_port == 0 || self.dashboard_port == 0 {
            return Err(ConfigError::Invalid("port cannot be 0".to_string()));
        }
        if self.auth_port == self.acct_port {
            return Err(ConfigError::Invalid(
                "auth and acct ports must differ".to_string(),
            ));
        }
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::Invalid("JWT secret cannot be empty".to_string()));
        }
        if self.default_secret.is_empty() {
            return Err(ConfigError::Invalid(
                "default shared secret cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// True when the JWT secret was not supplied by the operator
    pub fn jwt_secret_is_default(&self) -> bool {
        self.jwt_secret == "wisprd-insecure-dev-secret"
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            auth_port: 1812,
            acct_port: 1813,
            dashboard_port: 8080,
            database_path: "wisprd.db".to_string(),
            default_secret: "testing123".to_string(),
            admin_username: "admin".to_string(),
            admin_password: "admin123".to_string(),
            jwt_secret: "wisprd-insecure-dev-secret".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.auth_port, 1812);
        assert_eq!(config.acct_port, 1813);
        assert!(config.jwt_secret_is_default());
    }

    #[test]
    fn zero_port_rejected() {
        let config = Config {
            auth_port: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn colliding_ports_rejected() {
        let config = Config {
            acct_port: 1812,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_jwt_secret_rejected() {
        let config = Config {
            jwt_secret: String::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
