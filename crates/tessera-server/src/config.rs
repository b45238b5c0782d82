//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

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

    /// Service identity settings.
    #[serde(default)]
    pub identity: IdentityConfig,
}

/// Network configuration for the HTTP and TCP listeners.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// HTTP port to listen on.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Raw TCP message port to listen on.
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Busy timeout for SQLite connections, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled SQLite connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "tessera_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Service identity configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityConfig {
    /// Path of the Ed25519 seed file. When absent, an ephemeral identity
    /// is generated at startup.
    #[serde(default)]
    pub key_path: Option<String>,

    /// Known witnesses and their reachable HTTP endpoints, used for
    /// discovery URL generation.
    #[serde(default)]
    pub witnesses: Vec<WitnessConfig>,
}

/// One witness endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WitnessConfig {
    /// The witness identifier prefix.
    pub prefix: String,
    /// The witness's reachable HTTP base URL (empty when unknown).
    #[serde(default)]
    pub url: String,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_http_port() -> u16 {
    5651
}

fn default_tcp_port() -> u16 {
    5652
}

fn default_db_path() -> String {
    "tessera.db".to_string()
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

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            tcp_port: default_tcp_port(),
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

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `TESSERA_HOST` overrides `server.host`
/// - `TESSERA_HTTP_PORT` overrides `server.http_port`
/// - `TESSERA_TCP_PORT` overrides `server.tcp_port`
/// - `TESSERA_DB_PATH` overrides `database.path`
/// - `TESSERA_LOG_LEVEL` overrides `logging.level`
/// - `TESSERA_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `TESSERA_KEY_PATH` overrides `identity.key_path`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
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

    // Environment variable overrides
    if let Ok(host) = std::env::var("TESSERA_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("TESSERA_HTTP_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.http_port = parsed;
        }
    }
    if let Ok(port) = std::env::var("TESSERA_TCP_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.tcp_port = parsed;
        }
    }
    if let Ok(db_path) = std::env::var("TESSERA_DB_PATH") {
        config.database.path = db_path;
    }
    if let Ok(level) = std::env::var("TESSERA_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("TESSERA_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(key_path) = std::env::var("TESSERA_KEY_PATH") {
        config.identity.key_path = Some(key_path);
    }

    Ok(config)
}
