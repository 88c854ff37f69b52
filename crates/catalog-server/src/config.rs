//! Configuration loading from file and environment variables.
//!
//! Shared by both binaries: `catalog-server` reads the `server`, `database`,
//! `pagination` and `logging` sections, `catalog-load` reads `database`,
//! `loader` and `logging`.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use thiserror::Error;

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "catalog.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// CSV loader settings.
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Listing endpoint defaults.
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
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

    /// Busy timeout for SQLite connections, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled SQLite connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Loader configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoaderConfig {
    /// Path to the CSV file to ingest.
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,

    /// Number of rows printed after a load.
    #[serde(default = "default_sample_rows")]
    pub sample_rows: u32,
}

/// Pagination defaults for `GET /api/products`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PaginationConfig {
    /// Page size used when the request has no `limit`.
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    /// Larger `limit` values are clamped to this.
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "catalog_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    5000
}

fn default_db_path() -> String {
    "ecommerce.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("products.csv")
}

fn default_sample_rows() -> u32 {
    5
}

fn default_limit() -> u32 {
    10
}

fn default_max_limit() -> u32 {
    1_000
}

fn default_log_level() -> String {
    "info".to_string()
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

impl DatabaseConfig {
    /// Pool tunables derived from this section.
    pub fn runtime_settings(&self) -> catalog_db::DbRuntimeSettings {
        catalog_db::DbRuntimeSettings {
            busy_timeout_ms: self.busy_timeout_ms,
            pool_max_size: self.pool_max_size,
            read_only: false,
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            sample_rows: default_sample_rows(),
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
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

    /// A value parsed but is not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Picks the config file path: first CLI argument, then
/// `CATALOG_CONFIG_PATH`, then [`DEFAULT_CONFIG_PATH`].
///
/// Returns the path and a label naming where it came from.
pub fn resolve_config_path() -> (String, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (path, "cli-arg");
    }

    if let Ok(path) = std::env::var("CATALOG_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (path, "env-var");
        }
    }

    (DEFAULT_CONFIG_PATH.to_string(), "default")
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `CATALOG_HOST` overrides `server.host`
/// - `CATALOG_PORT` overrides `server.port`
/// - `CATALOG_DB_PATH` overrides `database.path`
/// - `CATALOG_CSV_PATH` overrides `loader.csv_path`
/// - `CATALOG_LOG_LEVEL` overrides `logging.level`
/// - `CATALOG_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, or
/// if the pagination limits are inconsistent.
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

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;

    Ok(config)
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(host) = var("CATALOG_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = var("CATALOG_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(db_path) = var("CATALOG_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(csv_path) = var("CATALOG_CSV_PATH") {
        config.loader.csv_path = PathBuf::from(csv_path);
    }
    if let Some(level) = var("CATALOG_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("CATALOG_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let pagination = &config.pagination;
    if pagination.default_limit == 0 {
        return Err(ConfigError::Invalid(
            "pagination.default_limit must be at least 1".to_string(),
        ));
    }
    if pagination.max_limit < pagination.default_limit {
        return Err(ConfigError::Invalid(format!(
            "pagination.max_limit ({}) is below pagination.default_limit ({})",
            pagination.max_limit, pagination.default_limit
        )));
    }
    if config.database.pool_max_size == 0 {
        return Err(ConfigError::Invalid(
            "database.pool_max_size must be at least 1".to_string(),
        ));
    }
    Ok(())
}
