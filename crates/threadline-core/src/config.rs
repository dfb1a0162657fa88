//! Configuration
//!
//! TigerStyle: configuration is read once, validated, then frozen. The
//! service and backends receive immutable values at construction.
//!
//! Both loaders take a lookup function so tests can supply a map instead of
//! mutating the process environment; `from_env` wires in `std::env::var`.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::constants::{
    COMMENT_TEXT_LEN_MAX_DEFAULT, DB_CONN_MAX_LIFETIME_MINS_DEFAULT, DB_MAX_IDLE_CONNS_DEFAULT,
    DB_MAX_OPEN_CONNS_DEFAULT, DB_QUERY_TIMEOUT_SECS_DEFAULT, DB_SSLMODE_DEFAULT,
    LIST_LIMIT_DEFAULT, LIST_LIMIT_MAX_DEFAULT, USERNAME_LEN_MIN_DEFAULT,
};

// =============================================================================
// Errors
// =============================================================================

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable(s): {0}")]
    Missing(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// ServiceConfig
// =============================================================================

/// Business-rule limits consumed by the domain service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Minimum username length in characters
    pub min_username_len: usize,
    /// Page size used when a caller omits the limit
    pub default_list_limit: usize,
    /// Largest accepted page size
    pub max_list_limit: usize,
    /// Longest accepted comment in characters
    pub max_comment_len: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            min_username_len: USERNAME_LEN_MIN_DEFAULT,
            default_list_limit: LIST_LIMIT_DEFAULT,
            max_list_limit: LIST_LIMIT_MAX_DEFAULT,
            max_comment_len: COMMENT_TEXT_LEN_MAX_DEFAULT,
        }
    }
}

impl ServiceConfig {
    /// Read from the process environment, falling back to defaults.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if the resulting limits are incoherent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through `lookup`, falling back to defaults per key.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if the resulting limits are incoherent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            min_username_len: parse_or_default(&lookup, "MIN_USERNAME_LEN", USERNAME_LEN_MIN_DEFAULT),
            default_list_limit: parse_or_default(&lookup, "LIST_LIMIT", LIST_LIMIT_DEFAULT),
            max_list_limit: parse_or_default(&lookup, "MAX_LIST_LIMIT", LIST_LIMIT_MAX_DEFAULT),
            max_comment_len: parse_or_default(
                &lookup,
                "MAX_COMMENT_LENGTH",
                COMMENT_TEXT_LEN_MAX_DEFAULT,
            ),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the limits are usable together.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` on a zero maximum page size, a default
    /// page size outside `1..=max_list_limit`, or a zero comment length.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_list_limit == 0 {
            return Err(ConfigError::Invalid("max list limit must be positive".into()));
        }
        if self.default_list_limit == 0 || self.default_list_limit > self.max_list_limit {
            return Err(ConfigError::Invalid(format!(
                "default list limit {} must be in 1..={}",
                self.default_list_limit, self.max_list_limit
            )));
        }
        if self.max_comment_len == 0 {
            return Err(ConfigError::Invalid("max comment length must be positive".into()));
        }
        Ok(())
    }
}

// =============================================================================
// DbConfig
// =============================================================================

/// Connection and pool settings for the Postgres backend.
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Login role
    pub user: String,
    /// Login password
    pub password: String,
    /// Database name
    pub database: String,
    /// libpq-style sslmode (`disable`, `prefer`, `require`, ...)
    pub ssl_mode: String,
    /// Maximum open connections
    pub max_open_conns: u32,
    /// Connections kept open while idle
    pub max_idle_conns: u32,
    /// Maximum lifetime of a pooled connection
    pub conn_max_lifetime: Duration,
    /// Deadline applied to every statement
    pub query_timeout: Duration,
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("ssl_mode", &self.ssl_mode)
            .field("max_open_conns", &self.max_open_conns)
            .field("max_idle_conns", &self.max_idle_conns)
            .field("conn_max_lifetime", &self.conn_max_lifetime)
            .field("query_timeout", &self.query_timeout)
            .finish()
    }
}

impl DbConfig {
    /// Read from the process environment.
    ///
    /// # Errors
    /// Returns `ConfigError::Missing` naming every absent required variable,
    /// or `ConfigError::Invalid` for an unparsable port or a zero query
    /// timeout.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through `lookup`.
    ///
    /// # Errors
    /// Same as [`DbConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = required("POSTGRES_HOST");
        let port = required("POSTGRES_PORT");
        let user = required("POSTGRES_USER");
        let password = required("POSTGRES_PASSWORD");
        let database = required("POSTGRES_DB");

        let (Some(host), Some(port), Some(user), Some(password), Some(database)) =
            (host, port, user, password, database)
        else {
            let missing: Vec<&str> = [
                "POSTGRES_HOST",
                "POSTGRES_PORT",
                "POSTGRES_USER",
                "POSTGRES_PASSWORD",
                "POSTGRES_DB",
            ]
            .into_iter()
            .filter(|key| required(key).is_none())
            .collect();
            return Err(ConfigError::Missing(missing.join(", ")));
        };

        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|e| ConfigError::Invalid(format!("POSTGRES_PORT={port}: {e}")))?;

        let query_timeout_secs = parse_or_default(
            &lookup,
            "POSTGRES_QUERY_TIMEOUT_SECS",
            DB_QUERY_TIMEOUT_SECS_DEFAULT,
        );
        if query_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "POSTGRES_QUERY_TIMEOUT_SECS must be positive".to_string(),
            ));
        }

        let lifetime_mins = parse_or_default(
            &lookup,
            "POSTGRES_CONN_MAX_LIFETIME",
            DB_CONN_MAX_LIFETIME_MINS_DEFAULT,
        );

        let ssl_mode = lookup("POSTGRES_SSLMODE")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DB_SSLMODE_DEFAULT.to_string());

        Ok(Self {
            host,
            port,
            user,
            password,
            database,
            ssl_mode,
            max_open_conns: parse_or_default(
                &lookup,
                "POSTGRES_MAX_OPEN_CONNS",
                DB_MAX_OPEN_CONNS_DEFAULT,
            ),
            max_idle_conns: parse_or_default(
                &lookup,
                "POSTGRES_MAX_IDLE_CONNS",
                DB_MAX_IDLE_CONNS_DEFAULT,
            ),
            conn_max_lifetime: Duration::from_secs(lifetime_mins.saturating_mul(60)),
            query_timeout: Duration::from_secs(query_timeout_secs),
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display + Copy,
{
    match lookup(key) {
        None => {
            warn!(key, %default, "variable not set, using default");
            default
        }
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, %default, "variable is not a valid number, using default");
                default
            }
        },
    }
}

// =============================================================================
// Tests
// =============================================================================
