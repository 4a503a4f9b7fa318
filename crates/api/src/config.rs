//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Log output format for the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Server configuration.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default `0.0.0.0`)
/// - `PORT`: listen port (default `3000`)
/// - `RUST_LOG`: tracing filter directive (default `info`)
/// - `LOG_FORMAT`: `text` or `json` (default `text`)
/// - `DATABASE_URL`: PostgreSQL URL; orders are kept in memory when unset
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default `5`)
/// - `CART_SERVICE_URL`: cart service base URL (default `http://localhost:8082`)
/// - `CATALOG_SERVICE_URL`: catalog base URL (default `http://localhost:8081`)
/// - `GATEWAY_TIMEOUT_SECS`: per-request timeout for both (default `5`)
///
/// Unparseable numbers fall back to their defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub cart_service_url: String,
    pub catalog_service_url: String,
    pub gateway_timeout: Duration,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: number("PORT")
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: number("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.database_max_connections),
            cart_service_url: lookup("CART_SERVICE_URL").unwrap_or(defaults.cart_service_url),
            catalog_service_url: lookup("CATALOG_SERVICE_URL")
                .unwrap_or(defaults.catalog_service_url),
            gateway_timeout: number("GATEWAY_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.gateway_timeout),
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
            cart_service_url: "http://localhost:8082".to_string(),
            catalog_service_url: "http://localhost:8081".to_string(),
            gateway_timeout: Duration::from_secs(5),
        }
    }
}
