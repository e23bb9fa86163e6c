//! Connection configuration.

use crate::env;
use crate::error::{QbError, QbResult};
use crate::log::SqlLog;

/// Environment variable holding the connection string.
pub const DATABASE_URL: &str = "DATABASE_URL";
/// Pool size override.
pub const POOL_MAX_SIZE: &str = "PGQB_POOL_MAX_SIZE";
/// Enable or disable SQL debug events.
pub const LOG_SQL: &str = "PGQB_LOG_SQL";
/// Truncation length for logged SQL.
pub const LOG_SQL_MAX_LEN: &str = "PGQB_LOG_SQL_MAX_LEN";

/// Settings for connecting and for builder logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectConfig {
    pub database_url: String,
    pub pool_max_size: usize,
    pub log_sql: bool,
    pub max_logged_sql_len: usize,
}

impl ConnectConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            pool_max_size: 16,
            log_sql: true,
            max_logged_sql_len: 200,
        }
    }

    /// Read the configuration from the process environment.
    ///
    /// `DATABASE_URL` is required; the other settings fall back to their
    /// defaults when unset or unparsable. Load a `.env` file beforehand if
    /// you keep settings there.
    pub fn from_env() -> QbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> QbResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup(DATABASE_URL)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| QbError::Config(format!("{DATABASE_URL} is not set")))?;

        let defaults = Self::new(database_url);
        let config = Self {
            pool_max_size: lookup(POOL_MAX_SIZE)
                .and_then(|v| env::parse_uint::<usize>(&v))
                .filter(|n| *n > 0)
                .unwrap_or(defaults.pool_max_size),
            log_sql: lookup(LOG_SQL)
                .and_then(|v| env::parse_bool(&v))
                .unwrap_or(defaults.log_sql),
            max_logged_sql_len: lookup(LOG_SQL_MAX_LEN)
                .and_then(|v| env::parse_uint::<usize>(&v))
                .unwrap_or(defaults.max_logged_sql_len),
            ..defaults
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            target: "pgqb",
            pool_max_size = config.pool_max_size,
            log_sql = config.log_sql,
            max_logged_sql_len = config.max_logged_sql_len,
            "loaded connection config"
        );

        Ok(config)
    }

    pub fn pool_max_size(mut self, size: usize) -> Self {
        self.pool_max_size = size;
        self
    }

    pub fn log_sql(mut self, enabled: bool) -> Self {
        self.log_sql = enabled;
        self
    }

    pub fn max_logged_sql_len(mut self, len: usize) -> Self {
        self.max_logged_sql_len = len;
        self
    }

    /// Builder log settings derived from this configuration.
    pub fn sql_log(&self) -> SqlLog {
        SqlLog {
            enabled: self.log_sql,
            max_sql_length: Some(self.max_logged_sql_len),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn database_url_is_required() {
        let err = ConnectConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, QbError::Config(_)));

        let err = ConnectConfig::from_lookup(lookup_from(&[(DATABASE_URL, "  ")])).unwrap_err();
        assert!(matches!(err, QbError::Config(_)));
    }

    #[test]
    fn defaults_apply() {
        let config =
            ConnectConfig::from_lookup(lookup_from(&[(DATABASE_URL, "postgres://localhost/app")]))
                .unwrap();
        assert_eq!(config, ConnectConfig::new("postgres://localhost/app"));
        assert_eq!(config.pool_max_size, 16);
        assert!(config.log_sql);
        assert_eq!(config.max_logged_sql_len, 200);
    }

    #[test]
    fn overrides_and_bad_values() {
        let config = ConnectConfig::from_lookup(lookup_from(&[
            (DATABASE_URL, "postgres://localhost/app"),
            (POOL_MAX_SIZE, "0x20"),
            (LOG_SQL, "F"),
            (LOG_SQL_MAX_LEN, "lots"),
        ]))
        .unwrap();
        assert_eq!(config.pool_max_size, 32);
        assert!(!config.log_sql);
        assert_eq!(config.max_logged_sql_len, 200);
    }

    #[test]
    fn zero_pool_size_falls_back() {
        let config = ConnectConfig::from_lookup(lookup_from(&[
            (DATABASE_URL, "postgres://localhost/app"),
            (POOL_MAX_SIZE, "0"),
        ]))
        .unwrap();
        assert_eq!(config.pool_max_size, 16);
    }

    #[test]
    fn sql_log_follows_config() {
        let log = ConnectConfig::new("postgres://x")
            .log_sql(false)
            .max_logged_sql_len(64)
            .sql_log();
        assert!(!log.enabled);
        assert_eq!(log.max_sql_length, Some(64));
    }
}
