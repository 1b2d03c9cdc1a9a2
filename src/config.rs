//! Client configuration
//!
//! Connection settings for an ArcadeDB server, loadable from a JSON file and
//! overridable from the environment.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default API base path
pub const DEFAULT_API_BASE: &str = "/api/v1";

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config: {0}")]
    Read(String),

    /// Config file is not valid JSON for this structure
    #[error("Invalid config JSON: {0}")]
    Parse(String),

    /// A field holds a value outside its allowed range
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Retry settings for the transport layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds (default: 1000)
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Delay multiplier applied after each retry (default: 2.0)
    #[serde(default = "default_backoff")]
    pub backoff: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_backoff() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
            backoff: default_backoff(),
        }
    }
}

/// Connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server host (required)
    pub host: String,

    /// Server port (default: 2480)
    #[serde(default = "default_port")]
    pub port: u16,

    /// "http" or "https" (default: "http")
    #[serde(default = "default_protocol")]
    pub protocol: String,

    #[serde(default, alias = "user")]
    pub username: String,

    #[serde(default, alias = "pw")]
    pub password: String,

    /// Content type sent with every request (default: "application/json")
    #[serde(default = "default_content_type")]
    pub content_type: String,

    /// API base path (default: "/api/v1")
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Per-request timeout, none by default
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_port() -> u16 {
    2480
}

fn default_protocol() -> String {
    "http".to_string()
}

fn default_content_type() -> String {
    "application/json".to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl ClientConfig {
    /// Create a config for the given server with default settings
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            protocol: default_protocol(),
            username: username.into(),
            password: password.into(),
            content_type: default_content_type(),
            api_base: default_api_base(),
            retry: RetryConfig::default(),
            timeout_ms: None,
        }
    }

    /// Load and validate configuration from a JSON file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;

        let config: ClientConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Apply `ARCADE_API_*` environment overrides
    pub fn with_env_overrides(self) -> ConfigResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base) = lookup("ARCADE_API_ENDPOINT") {
            self.api_base = base;
        }
        if let Some(raw) = lookup("ARCADE_API_RETRY_MAX") {
            self.retry.max_attempts = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid("ARCADE_API_RETRY_MAX", raw.clone()))?;
        }
        if let Some(raw) = lookup("ARCADE_API_RETRY_DELAY") {
            let seconds: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid("ARCADE_API_RETRY_DELAY", raw.clone()))?;
            self.retry.delay_ms = seconds.checked_mul(1000).ok_or_else(|| {
                ConfigError::invalid(
                    "ARCADE_API_RETRY_DELAY",
                    format!("{} seconds is too large", seconds),
                )
            })?;
        }
        if let Some(raw) = lookup("ARCADE_API_RETRY_BACKOFF") {
            self.retry.backoff = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid("ARCADE_API_RETRY_BACKOFF", raw.clone()))?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate field ranges
    pub fn validate(&self) -> ConfigResult<()> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::invalid("host", "Host is required"));
        }
        if self.port == 0 {
            return Err(ConfigError::invalid("port", "Port is required"));
        }
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::invalid(
                "protocol",
                format!("'{}' is not one of http, https", self.protocol),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::invalid("retry.max_attempts", "must be > 0"));
        }
        if !(self.retry.backoff.is_finite() && self.retry.backoff >= 1.0) {
            return Err(ConfigError::invalid("retry.backoff", "must be >= 1.0"));
        }
        Ok(())
    }

    /// Server root URL
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(&self.api_base)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl fmt::Display for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<host={} port={} user={}>",
            self.host, self.port, self.username
        )
    }
}

/// Logical API endpoints, relative to the server root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

impl Endpoints {
    pub fn new(base: &str) -> Self {
        let trimmed = base.trim().trim_end_matches('/');
        let base = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        };
        Self { base }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Server-level commands (create/drop/list databases)
    pub fn server(&self) -> String {
        format!("{}/server", self.base)
    }

    pub fn exists(&self, database: &str) -> String {
        format!("{}/exists/{}", self.base, database)
    }

    pub fn databases(&self) -> String {
        format!("{}/databases", self.base)
    }

    pub fn query(&self, database: &str) -> String {
        format!("{}/query/{}", self.base, database)
    }

    pub fn command(&self, database: &str) -> String {
        format!("{}/command/{}", self.base, database)
    }

    pub fn begin(&self, database: &str) -> String {
        format!("{}/begin/{}", self.base, database)
    }

    pub fn commit(&self, database: &str) -> String {
        format!("{}/commit/{}", self.base, database)
    }

    pub fn rollback(&self, database: &str) -> String {
        format!("{}/rollback/{}", self.base, database)
    }
}
