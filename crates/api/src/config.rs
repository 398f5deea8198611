use std::path::PathBuf;
use std::str::FromStr;

use warden_core::config::AuthConfig;
use warden_core::error::CoreError;

/// Output format of the process-wide tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Read `LOG_FORMAT`, falling back to text on anything unrecognised.
    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }
}

impl FromStr for LogFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(CoreError::Validation(format!("unknown LOG_FORMAT '{other}'"))),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secrets have defaults suitable for local
/// development. Without `DATABASE_URL` / `REDIS_URL` the server runs on
/// in-memory stores, which only works for a single node.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks to drain (default: `30`).
    pub shutdown_timeout_secs: u64,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    /// Key prefix inside Redis; the store's default when unset.
    pub redis_namespace: Option<String>,
    /// JSON user directory.
    pub users_file: Option<PathBuf>,
    pub log_format: LogFormat,
    pub auth: AuthConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `DATABASE_URL`         | unset (in-memory sessions) |
    /// | `REDIS_URL`            | unset (in-memory KV)       |
    /// | `REDIS_NAMESPACE`      | `warden`                   |
    /// | `USERS_FILE`           | unset (empty directory)    |
    /// | `LOG_FORMAT`           | `text`                     |
    ///
    /// Token, session-cap and lockout settings come from
    /// [`AuthConfig::from_env`].
    pub fn from_env() -> Result<Self, CoreError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = parse_var("PORT", 3000)?;

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = parse_var("REQUEST_TIMEOUT_SECS", 30)?;
        let shutdown_timeout_secs: u64 = parse_var("SHUTDOWN_TIMEOUT_SECS", 30)?;

        let log_format = match std::env::var("LOG_FORMAT") {
            Ok(raw) => raw.parse()?,
            Err(_) => LogFormat::default(),
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            database_url: non_empty_var("DATABASE_URL"),
            redis_url: non_empty_var("REDIS_URL"),
            redis_namespace: non_empty_var("REDIS_NAMESPACE"),
            users_file: non_empty_var("USERS_FILE").map(PathBuf::from),
            log_format,
            auth: AuthConfig::from_env()?,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(name: &str, default: T) -> Result<T, CoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| CoreError::Validation(format!("{name} must be a valid number: {e}"))),
        Err(_) => Ok(default),
    }
}
