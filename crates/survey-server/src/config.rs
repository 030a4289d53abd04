//! Server configuration from environment.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    /// SQLite file; `None` keeps every record in memory.
    pub database_path: Option<String>,
    pub database_max_connections: u32,
    /// Oracle service base URL; `None` disables the oracle.
    pub oracle_url: Option<String>,
    pub oracle_api_key: Option<String>,
    pub oracle_timeout: Duration,
    /// Allowed CORS origin; `None` allows any.
    pub frontend_origin: Option<String>,
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: env::var("SURVEY_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
            database_path: non_empty("SURVEY_DATABASE_PATH"),
            database_max_connections: env::var("SURVEY_DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(5),
            oracle_url: non_empty("SURVEY_ORACLE_URL"),
            oracle_api_key: non_empty("SURVEY_ORACLE_API_KEY"),
            oracle_timeout: Duration::from_secs(
                env::var("SURVEY_ORACLE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(15),
            ),
            frontend_origin: non_empty("SURVEY_FRONTEND_ORIGIN"),
            log_json: env::var("SURVEY_LOG_JSON")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }
}

impl Default for Config {
    /// In-memory storage, oracle disabled.
    fn default() -> Self {
        Self {
            server_port: 3000,
            database_path: None,
            database_max_connections: 5,
            oracle_url: None,
            oracle_api_key: None,
            oracle_timeout: Duration::from_secs(15),
            frontend_origin: None,
            log_json: false,
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
