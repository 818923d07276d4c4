//! Configuration management for contacts-api
//!
//! This module handles loading, parsing, and validating application
//! configuration from YAML files and environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Token issuance configuration
    #[serde(default)]
    pub auth: AuthTokenConfig,

    /// Session cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Outbound email configuration
    #[serde(default)]
    pub mail: MailConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileRead(format!("Failed to read config file: {}", e)))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // First, expand environment variables in the YAML string
        let expanded = expand_env_vars(yaml);
        serde_yaml::from_str(&expanded)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse YAML: {}", e)))
    }

    /// Load configuration from environment variables with prefix CONTACTS_API_
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // Server config from env
        if let Ok(host) = std::env::var("CONTACTS_API_SERVER_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("CONTACTS_API_SERVER_PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid port number".to_string()))?;
        }

        // Database config from env
        if let Ok(path) = std::env::var("CONTACTS_API_DATABASE_PATH") {
            config.database.path = path;
        }

        // Auth config from env
        if let Ok(secret) = std::env::var("CONTACTS_API_SECRET_KEY") {
            config.auth.secret_key = secret;
        }

        // Cache config from env
        if let Ok(url) = std::env::var("CONTACTS_API_REDIS_URL") {
            config.cache.backend = "redis".to_string();
            config.cache.redis = Some(RedisCacheConfig {
                url,
                ..Default::default()
            });
        }

        // Logging config from env
        if let Ok(level) = std::env::var("CONTACTS_API_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Validate settings that have no safe default
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.secret_key.is_empty() {
            return Err(ConfigError::MissingRequired("auth.secret_key".to_string()));
        }
        if self.cache.backend == "redis" && self.cache.redis.is_none() {
            return Err(ConfigError::MissingRequired("cache.redis.url".to_string()));
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Token issuance configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthTokenConfig {
    /// Shared HMAC signing secret
    #[serde(default)]
    pub secret_key: String,

    /// Access token lifetime in minutes
    #[serde(default = "default_access_expire_minutes")]
    pub access_token_expire_minutes: i64,

    /// Refresh token lifetime in days
    #[serde(default = "default_refresh_expire_days")]
    pub refresh_token_expire_days: i64,

    /// Email-verification token lifetime in hours
    #[serde(default = "default_verification_expire_hours")]
    pub verification_token_expire_hours: i64,

    /// Password-reset token lifetime in hours
    #[serde(default = "default_reset_expire_hours")]
    pub reset_token_expire_hours: i64,
}

impl Default for AuthTokenConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            access_token_expire_minutes: default_access_expire_minutes(),
            refresh_token_expire_days: default_refresh_expire_days(),
            verification_token_expire_hours: default_verification_expire_hours(),
            reset_token_expire_hours: default_reset_expire_hours(),
        }
    }
}

fn default_access_expire_minutes() -> i64 {
    30
}

fn default_refresh_expire_days() -> i64 {
    7
}

fn default_verification_expire_hours() -> i64 {
    24
}

fn default_reset_expire_hours() -> i64 {
    1
}

/// Session cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Cache backend to use ("memory" or "redis")
    #[serde(default = "default_cache_backend")]
    pub backend: String,

    /// Redis backend configuration (required when backend is "redis")
    #[serde(default)]
    pub redis: Option<RedisCacheConfig>,

    /// TTL for cached user snapshots in seconds
    #[serde(default = "default_user_ttl")]
    pub user_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            redis: None,
            user_ttl_secs: default_user_ttl(),
        }
    }
}

fn default_cache_backend() -> String {
    "memory".to_string()
}

fn default_user_ttl() -> u64 {
    900 // 15 minutes
}

/// Redis cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedisCacheConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Key prefix for all cache entries
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            prefix: default_redis_prefix(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_prefix() -> String {
    "contacts-api:".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "/data/db/contacts-api.db".to_string()
}

/// Outbound email configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MailConfig {
    /// Public base URL used to build verification and reset links
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Display name used in outgoing messages
    #[serde(default = "default_mail_from_name")]
    pub from_name: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            from_name: default_mail_from_name(),
        }
    }
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_mail_from_name() -> String {
    "Contacts API".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format ("json" or "pretty")
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Configuration error types
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Error reading configuration file
    #[error("Failed to read configuration file: {0}")]
    FileRead(String),

    /// Error parsing configuration
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

/// Expand environment variables in a string
///
/// Supports `${VAR_NAME}` syntax
fn expand_env_vars(input: &str) -> String {
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .expect("Invalid regex pattern for environment variable expansion");

    re.replace_all(input, |caps: &regex_lite::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}
