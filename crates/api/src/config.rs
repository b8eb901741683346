//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL URL; unset keeps everything in memory
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `5`)
/// - `AUTHORIZER_URL`: payment authorizer endpoint; unset approves every payment
/// - `AUTHORIZER_TIMEOUT_MS`: authorizer request timeout (default: `3000`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub authorizer_url: Option<String>,
    pub authorizer_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Unparseable numbers fall back to their defaults; empty URLs count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let url = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or(defaults.log_format),
            database_url: url("DATABASE_URL"),
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.database_max_connections),
            authorizer_url: url("AUTHORIZER_URL"),
            authorizer_timeout: lookup("AUTHORIZER_TIMEOUT_MS")
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.authorizer_timeout),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 5,
            authorizer_url: None,
            authorizer_timeout: Duration::from_millis(3000),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.database_url.is_none());
        assert_eq!(config.database_max_connections, 5);
        assert!(config.authorizer_url.is_none());
        assert_eq!(config.authorizer_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.addr(), "0.0.0.0:3000");
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_values_are_read() {
        let config = config_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("LOG_FORMAT", "JSON"),
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("DATABASE_MAX_CONNECTIONS", "20"),
            ("AUTHORIZER_URL", "https://authorizer.test/authorize"),
            ("AUTHORIZER_TIMEOUT_MS", "250"),
        ]);
        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/shop")
        );
        assert_eq!(config.database_max_connections, 20);
        assert_eq!(
            config.authorizer_url.as_deref(),
            Some("https://authorizer.test/authorize")
        );
        assert_eq!(config.authorizer_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = config_from(&[("PORT", "http"), ("AUTHORIZER_TIMEOUT_MS", "-1")]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.authorizer_timeout, Duration::from_millis(3000));
    }

    #[test]
    fn test_blank_urls_are_unset() {
        let config = config_from(&[("DATABASE_URL", ""), ("AUTHORIZER_URL", "  ")]);
        assert!(config.database_url.is_none());
        assert!(config.authorizer_url.is_none());
    }
}
