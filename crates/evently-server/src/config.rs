//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

use crate::graphql::SchemaOptions;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// GraphQL endpoint settings.
    #[serde(default)]
    pub graphql: GraphqlConfig,

    /// Notification channel settings.
    #[serde(default)]
    pub pubsub: PubSubConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "evently_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// GraphQL configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlConfig {
    /// Attach the subscription root and mount `/graphql/ws`.
    #[serde(default)]
    pub subscriptions: bool,

    /// Serve GraphiQL on `GET /graphql`.
    #[serde(default)]
    pub graphiql: bool,

    /// Upper bound for each suspend point of a mutation (save, publish).
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

/// Notification channel configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PubSubConfig {
    /// Per-topic buffer size. Subscribers further behind than this skip ahead.
    #[serde(default = "default_pubsub_capacity")]
    pub capacity: usize,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    4000
}

fn default_db_path() -> String {
    "evently.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_operation_timeout_ms() -> u64 {
    10_000
}

fn default_pubsub_capacity() -> usize {
    evently_pubsub::DEFAULT_CAPACITY
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for GraphqlConfig {
    fn default() -> Self {
        Self {
            subscriptions: false,
            graphiql: false,
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

impl Default for PubSubConfig {
    fn default() -> Self {
        Self {
            capacity: default_pubsub_capacity(),
        }
    }
}

impl DatabaseConfig {
    /// Pool settings for [`evently_db::create_pool`].
    pub fn runtime_settings(&self) -> evently_db::DbRuntimeSettings {
        evently_db::DbRuntimeSettings {
            busy_timeout_ms: self.busy_timeout_ms,
            pool_max_size: self.pool_max_size,
        }
    }
}

impl GraphqlConfig {
    /// Schema composition options derived from this section.
    pub fn schema_options(&self) -> SchemaOptions {
        SchemaOptions {
            subscriptions: self.subscriptions,
            operation_timeout: Duration::from_millis(self.operation_timeout_ms),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting parsed but its value cannot be used.
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        key: &'static str,
        reason: &'static str,
    },
}

fn env_flag(value: &str) -> bool {
    value == "true" || value == "1"
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `EVENTLY_HOST` overrides `server.host`
/// - `EVENTLY_PORT` overrides `server.port`
/// - `EVENTLY_DB_PATH` overrides `database.path`
/// - `EVENTLY_LOG_LEVEL` overrides `logging.level`
/// - `EVENTLY_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `EVENTLY_GRAPHQL_SUBSCRIPTIONS` overrides `graphql.subscriptions`
/// - `EVENTLY_GRAPHQL_GRAPHIQL` overrides `graphql.graphiql`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed,
/// or if `graphql.operation_timeout_ms` is zero.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    if let Ok(host) = std::env::var("EVENTLY_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("EVENTLY_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(db_path) = std::env::var("EVENTLY_DB_PATH") {
        config.database.path = db_path;
    }
    if let Ok(level) = std::env::var("EVENTLY_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("EVENTLY_LOG_JSON") {
        config.logging.json = env_flag(&json);
    }
    if let Ok(enabled) = std::env::var("EVENTLY_GRAPHQL_SUBSCRIPTIONS") {
        config.graphql.subscriptions = env_flag(&enabled);
    }
    if let Ok(enabled) = std::env::var("EVENTLY_GRAPHQL_GRAPHIQL") {
        config.graphql.graphiql = env_flag(&enabled);
    }

    if config.graphql.operation_timeout_ms == 0 {
        return Err(ConfigError::Invalid {
            key: "graphql.operation_timeout_ms",
            reason: "must be greater than zero",
        });
    }

    Ok(config)
}
