use crate::error::{Result, RotaError};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiServerConfig,
    /// Account API (proxy listing) configuration
    pub account: AccountConfig,
    /// Rotation workflow timings
    pub rotation: RotationConfig,
    /// Rotation history persistence
    pub history: HistoryConfig,
    /// Database configuration (postgres history backend only)
    pub database: DatabaseConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port for the API server (default: 8001)
    pub port: u16,
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
    /// Allowed CORS origins (comma-separated, empty = localhost only)
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AccountConfig {
    /// Base URL of the account API
    pub base_url: Url,
    /// Default credential used when a request carries none
    pub api_token: Option<String>,
    /// Request timeout in seconds
    pub request_timeout: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationConfig {
    /// Timeout for the trigger call in seconds
    pub trigger_timeout: u64,
    /// Fixed wait after a successful trigger in seconds
    pub settle_delay: u64,
    /// Number of status polls before falling back to the account listing
    pub poll_attempts: u32,
    /// Wait between status polls in seconds
    pub poll_interval: u64,
    /// Wait before the second account re-fetch in seconds
    pub fallback_delay: u64,
    /// Default verification budget in seconds
    pub max_wait: u64,
    /// Maximum in-flight workflows during a batch
    pub max_concurrency: usize,
    /// Attempts for transient network failures
    pub retry_attempts: u32,
    /// Base backoff delay in milliseconds
    pub retry_base_delay_ms: u64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            trigger_timeout: 30,
            settle_delay: 10,
            poll_attempts: 5,
            poll_interval: 4,
            fallback_delay: 5,
            max_wait: 90,
            max_concurrency: 3,
            retry_attempts: 3,
            retry_base_delay_ms: 1000,
        }
    }
}

impl RotationConfig {
    pub fn trigger_timeout(&self) -> Duration {
        Duration::from_secs(self.trigger_timeout)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_secs(self.fallback_delay)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

/// Where the rotation history is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryBackendKind {
    File,
    Postgres,
    Memory,
}

impl HistoryBackendKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "file" | "json" => Some(Self::File),
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            "memory" | "mem" => Some(Self::Memory),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Postgres => "postgres",
            Self::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Backend kind (file, postgres, memory)
    pub backend: HistoryBackendKind,
    /// JSON file location for the file backend
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database host
    pub host: String,
    /// Database port
    pub port: u16,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Database name
    pub name: String,
    /// SSL mode (disable, require, prefer)
    pub ssl_mode: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Minimum connections in pool
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = RotationConfig::default();

        Ok(Config {
            api: ApiServerConfig {
                port: get_env_or("API_PORT", "8001").parse().map_err(|_| {
                    RotaError::InvalidConfig("API_PORT must be a valid port number".into())
                })?,
                host: get_env_or("API_HOST", "0.0.0.0"),
                cors_origins: get_env_or("CORS_ORIGINS", "")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            account: AccountConfig {
                base_url: parse_account_url()?,
                api_token: env::var("ACCOUNT_API_TOKEN")
                    .ok()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty()),
                request_timeout: parse_or("ACCOUNT_REQUEST_TIMEOUT", 15)?,
            },
            rotation: RotationConfig {
                trigger_timeout: parse_or("ROTATION_TRIGGER_TIMEOUT", defaults.trigger_timeout)?,
                settle_delay: parse_or("ROTATION_SETTLE_DELAY", defaults.settle_delay)?,
                poll_attempts: parse_or("ROTATION_POLL_ATTEMPTS", defaults.poll_attempts)?,
                poll_interval: parse_or("ROTATION_POLL_INTERVAL", defaults.poll_interval)?,
                fallback_delay: parse_or("ROTATION_FALLBACK_DELAY", defaults.fallback_delay)?,
                max_wait: parse_or("ROTATION_MAX_WAIT", defaults.max_wait)?,
                max_concurrency: get_env_or("ROTATION_MAX_CONCURRENCY", "3")
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| {
                        RotaError::InvalidConfig(
                            "ROTATION_MAX_CONCURRENCY must be a positive number".into(),
                        )
                    })?,
                retry_attempts: parse_or("ROTATION_RETRY_ATTEMPTS", defaults.retry_attempts)?
                    .max(1),
                retry_base_delay_ms: parse_or(
                    "ROTATION_RETRY_BASE_DELAY_MS",
                    defaults.retry_base_delay_ms,
                )?,
            },
            history: HistoryConfig {
                backend: HistoryBackendKind::from_str(&get_env_or("HISTORY_BACKEND", "file"))
                    .ok_or_else(|| {
                        RotaError::InvalidConfig(
                            "HISTORY_BACKEND must be one of file, postgres, memory".into(),
                        )
                    })?,
                path: PathBuf::from(get_env_or("HISTORY_PATH", "data/rotation_history.json")),
            },
            database: DatabaseConfig {
                host: get_env_or("DB_HOST", "localhost"),
                port: get_env_or("DB_PORT", "5432").parse().map_err(|_| {
                    RotaError::InvalidConfig("DB_PORT must be a valid port number".into())
                })?,
                user: get_env_or("DB_USER", "rota"),
                password: get_env_or("DB_PASSWORD", "rota_password"),
                name: get_env_or("DB_NAME", "rota"),
                ssl_mode: get_env_or("DB_SSLMODE", "disable"),
                max_connections: get_env_or("DB_MAX_CONNECTIONS", "10")
                    .parse()
                    .map_err(|_| {
                        RotaError::InvalidConfig("DB_MAX_CONNECTIONS must be a valid number".into())
                    })?,
                min_connections: get_env_or("DB_MIN_CONNECTIONS", "1").parse().map_err(|_| {
                    RotaError::InvalidConfig("DB_MIN_CONNECTIONS must be a valid number".into())
                })?,
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "json"),
            },
        })
    }

    /// Get the database connection URL
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.database.user,
            self.database.password,
            self.database.host,
            self.database.port,
            self.database.name,
            self.database.ssl_mode
        )
    }

    /// Get the API server address
    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn parse_account_url() -> Result<Url> {
    let raw = get_env_or("ACCOUNT_API_URL", "https://api.example.invalid/v1");
    let url = Url::parse(raw.trim()).map_err(|e| {
        RotaError::InvalidConfig(format!("ACCOUNT_API_URL must be a valid URL: {}", e))
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(RotaError::InvalidConfig(format!(
            "ACCOUNT_API_URL has unsupported scheme: {}",
            other
        ))),
    }
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a numeric environment variable; unset means `default`, garbage is an error
fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            RotaError::InvalidConfig(format!("{} must be a valid number, got {:?}", key, raw))
        }),
        Err(_) => Ok(default),
    }
}

/// Fully populated config with the memory history backend
#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        api: ApiServerConfig {
            port: 8001,
            host: "0.0.0.0".to_string(),
            cors_origins: vec![],
        },
        account: AccountConfig {
            base_url: Url::parse("https://account.example").unwrap(),
            api_token: None,
            request_timeout: 15,
        },
        rotation: RotationConfig::default(),
        history: HistoryConfig {
            backend: HistoryBackendKind::Memory,
            path: PathBuf::from("history.json"),
        },
        database: DatabaseConfig {
            host: "localhost".to_string(),
            port: 5432,
            user: "rota".to_string(),
            password: "rota_password".to_string(),
            name: "rota".to_string(),
            ssl_mode: "disable".to_string(),
            max_connections: 10,
            min_connections: 1,
        },
        log: LogConfig {
            level: "info".to_string(),
            format: "json".to_string(),
        },
    }
}
