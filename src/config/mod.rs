//! Configuration module for the Taskboard backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Secret used when `TASKBOARD_JWT_SECRET` is not set. Only suitable for development.
pub const DEV_JWT_SECRET: &str = "taskboard-dev-secret-change-me";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {var} value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of the human readable format
    pub log_json: bool,
    /// HMAC secret for signing session tokens
    pub jwt_secret: String,
    /// Whether `jwt_secret` came from the environment
    pub jwt_secret_configured: bool,
    /// Lifetime of access tokens in minutes
    pub access_ttl_minutes: i64,
    /// Lifetime of refresh tokens in days
    pub refresh_ttl_days: i64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("TASKBOARD_DB_PATH")
            .unwrap_or_else(|_| "./data/taskboard.sqlite".to_string())
            .into();

        let index_path = env::var("TASKBOARD_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let bind_addr = parse_var("TASKBOARD_BIND_ADDR", "127.0.0.1:8080")?;

        let log_level = env::var("TASKBOARD_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_json = parse_var("TASKBOARD_LOG_JSON", "false")?;

        let (jwt_secret, jwt_secret_configured) = match env::var("TASKBOARD_JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => (secret, true),
            _ => (DEV_JWT_SECRET.to_string(), false),
        };

        let access_ttl_minutes: i64 = parse_var("TASKBOARD_ACCESS_TTL_MINUTES", "60")?;
        let refresh_ttl_days: i64 = parse_var("TASKBOARD_REFRESH_TTL_DAYS", "7")?;
        if access_ttl_minutes <= 0 {
            return Err(ConfigError::Invalid {
                var: "TASKBOARD_ACCESS_TTL_MINUTES",
                value: access_ttl_minutes.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if refresh_ttl_days <= 0 {
            return Err(ConfigError::Invalid {
                var: "TASKBOARD_REFRESH_TTL_DAYS",
                value: refresh_ttl_days.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        Ok(Self {
            db_path,
            index_path,
            bind_addr,
            log_level,
            log_json,
            jwt_secret,
            jwt_secret_configured,
            access_ttl_minutes,
            refresh_ttl_days,
        })
    }
}

fn parse_var<T>(var: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let value = env::var(var).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
        value,
    })
}
