//! Service configuration.
//!
//! Values come from environment variables; a missing or malformed value
//! falls back to its default.

use std::time::Duration;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_ROWS: u32 = 1000;
const DEFAULT_LOG_FILE: &str = "connector.log";

/// Runtime configuration for the connector service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Service name, used in logs and response metadata.
    pub service_name: String,
    /// Address the HTTP listener binds to.
    pub host: String,
    /// Port the HTTP listener binds to.
    pub port: u16,
    /// Upper bound for opening a database connection.
    pub connect_timeout_secs: u64,
    /// Maximum number of rows returned by a single query.
    pub max_rows: u32,
    /// Log file path; `None` disables file logging.
    pub log_file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: String::new(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            max_rows: DEFAULT_MAX_ROWS,
            log_file: Some(DEFAULT_LOG_FILE.to_string()),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the process environment.
    pub fn load_with_service(service_name: &str) -> Self {
        Self::from_lookup(service_name, |key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// Recognised keys: `SERVER_HOST`, `SERVER_PORT`, `CONNECT_TIMEOUT_SECS`,
    /// `MAX_ROWS` and `LOG_FILE` (an empty value disables file logging).
    pub fn from_lookup<F>(service_name: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let log_file = match lookup("LOG_FILE") {
            Some(path) if path.trim().is_empty() => None,
            Some(path) => Some(path.trim().to_string()),
            None => defaults.log_file,
        };

        Self {
            service_name: service_name.to_string(),
            host: lookup("SERVER_HOST")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.host),
            port: parse_or("SERVER_PORT", lookup("SERVER_PORT"), defaults.port),
            connect_timeout_secs: parse_or(
                "CONNECT_TIMEOUT_SECS",
                lookup("CONNECT_TIMEOUT_SECS"),
                defaults.connect_timeout_secs,
            )
            .max(1),
            max_rows: parse_or("MAX_ROWS", lookup("MAX_ROWS"), defaults.max_rows).max(1),
            log_file,
        }
    }

    /// Connection timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match raw {
        Some(value) => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!(key, value = %value, "Invalid config value, using default");
                default
            }
        },
        None => default,
    }
}
