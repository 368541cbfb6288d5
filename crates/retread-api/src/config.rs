//! Server configuration read from the environment.

use std::str::FromStr;

use retread_history::config::{
    DEFAULT_CAPACITY, DEFAULT_PAGE_SIZE, DEFAULT_RETENTION_DAYS, HistoryConfig,
};

use crate::error::AppError;

/// Settings for one server process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `PostgreSQL` connection string.
    pub database_url: String,
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Upper bound on pooled database connections.
    pub database_max_connections: u32,
    /// Apply pending migrations before serving.
    pub run_migrations: bool,
    /// OTLP collector endpoint; span export is off when unset.
    pub otlp_endpoint: Option<String>,
    /// Change history tunables.
    pub history: HistoryConfig,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or a value
    /// does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable if set.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or a value
    /// does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("DATABASE_URL environment variable must be set".to_owned())
            })?;

        let history = HistoryConfig {
            capacity: parse_or(&lookup, "HISTORY_CAPACITY", DEFAULT_CAPACITY)?,
            page_size: parse_or(&lookup, "HISTORY_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            retention_days: parse_or(&lookup, "HISTORY_RETENTION_DAYS", DEFAULT_RETENTION_DAYS)?,
        };
        if history.capacity == 0 {
            return Err(AppError::Config(
                "HISTORY_CAPACITY must be at least 1".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port: parse_or(&lookup, "PORT", 3000)?,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            run_migrations: parse_or(&lookup, "RUN_MIGRATIONS", true)?,
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|e| !e.trim().is_empty()),
            history,
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid ({raw:?}): {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_apply_when_only_database_url_is_set() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/retread")]).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.database_max_connections, 10);
        assert!(config.run_migrations);
        assert!(config.otlp_endpoint.is_none());
        assert_eq!(config.history, HistoryConfig::default());
    }

    #[test]
    fn test_missing_database_url_is_a_config_error() {
        let result = config_from(&[("PORT", "8080")]);

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_history_settings_are_read() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/retread"),
            ("HISTORY_CAPACITY", "20"),
            ("HISTORY_PAGE_SIZE", "10"),
            ("HISTORY_RETENTION_DAYS", "7"),
            ("RUN_MIGRATIONS", "false"),
        ])
        .unwrap();

        assert_eq!(config.history.capacity, 20);
        assert_eq!(config.history.page_size, 10);
        assert_eq!(config.history.retention_days, 7);
        assert!(!config.run_migrations);
    }

    #[test]
    fn test_invalid_port_is_a_config_error() {
        let result = config_from(&[
            ("DATABASE_URL", "postgres://localhost/retread"),
            ("PORT", "seventy"),
        ]);

        match result {
            Err(AppError::Config(message)) => assert!(message.contains("PORT")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let result = config_from(&[
            ("DATABASE_URL", "postgres://localhost/retread"),
            ("HISTORY_CAPACITY", "0"),
        ]);

        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
