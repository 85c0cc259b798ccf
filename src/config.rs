//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables with development
//! defaults, except `API_KEY` which has no default. A `.env` file is read if
//! present.
//!
//! # Security Configuration
//!
//! - `API_KEY`: Shared secret every protected request must present in `X-API-Key` (required)
//! - `ALLOWED_IPS`: Comma-separated client addresses allowed through (default: `127.0.0.1,::1`)
//! - `AUDIT_AUTH_ATTEMPTS`: Log every authentication attempt (default: `true`)
//! - `AUDIT_BUFFER_SIZE`: Recent audit events kept in memory (default: 10000, 0 = disabled)
//!
//! # Observability
//!
//! - `RUST_LOG`: Log filter (default: `info`)
//! - `LOG_FORMAT`: `json` or `pretty` (default: `pretty`)
//! - `METRICS_PORT`: Prometheus listener port (default: 9090, 0 = disabled)

use std::env;
use std::fmt;

use crate::audit::DEFAULT_MEMORY_SINK_CAPACITY;
use crate::error::{AppError, AppResult};
use crate::middleware::{AuthConfig, mask_credential};

/// Keys shorter than this are accepted but reported at startup.
pub const RECOMMENDED_MIN_API_KEY_LEN: usize = 16;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Read `LOG_FORMAT`; anything other than `json` means pretty.
    pub fn from_env() -> Self {
        Self::parse(&env::var("LOG_FORMAT").unwrap_or_default())
    }

    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// The `Debug` representation masks the API key.
#[derive(Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    // =========================================================================
    // Security Configuration
    // =========================================================================
    /// Shared secret expected in the `X-API-Key` header
    pub api_key: String,

    /// Client addresses allowed through the authenticator (exact match)
    pub allowed_ips: Vec<String>,

    /// Whether the auth-attempt auditor wraps the authenticator
    pub audit_auth_attempts: bool,

    /// Capacity of the in-memory audit buffer (0 = disabled)
    pub audit_buffer_size: usize,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,

    /// Log output format
    pub log_format: LogFormat,

    /// Port for Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if `API_KEY` is missing or empty, a
    /// numeric variable does not parse, or the result fails validation.
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    fn from_lookup<F>(var: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            // Server
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: Self::parse_var(&var, "PORT", 3000)?,

            // Security
            api_key: var("API_KEY")
                .filter(|k| !k.is_empty())
                .ok_or_else(|| AppError::ConfigError("API_KEY must be set".to_string()))?,
            allowed_ips: Self::parse_list(
                &var("ALLOWED_IPS").unwrap_or_else(|| "127.0.0.1,::1".to_string()),
            ),
            audit_auth_attempts: Self::parse_var(&var, "AUDIT_AUTH_ATTEMPTS", true)?,
            audit_buffer_size: Self::parse_var(
                &var,
                "AUDIT_BUFFER_SIZE",
                DEFAULT_MEMORY_SINK_CAPACITY,
            )?,

            // Observability
            log_level: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            log_format: var("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(LogFormat::Pretty),
            metrics_port: Self::parse_var(&var, "METRICS_PORT", 9090)?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if validation fails.
    pub fn validate(&self) -> AppResult<()> {
        if self.api_key.is_empty() {
            return Err(AppError::ConfigError(
                "API_KEY must not be empty".to_string(),
            ));
        }

        if self.api_key.trim() != self.api_key {
            return Err(AppError::ConfigError(
                "API_KEY must not have leading or trailing whitespace".to_string(),
            ));
        }

        if self.allowed_ips.iter().any(|ip| ip.contains('/')) {
            return Err(AppError::ConfigError(
                "ALLOWED_IPS takes exact addresses; CIDR ranges are not supported".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the immutable settings for the authenticator.
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(self.api_key.clone(), self.allowed_ips.iter().cloned())
    }

    /// Whether the configured key is shorter than recommended.
    pub fn api_key_is_weak(&self) -> bool {
        self.api_key.chars().count() < RECOMMENDED_MIN_API_KEY_LEN
    }

    /// Check if the in-memory audit buffer is enabled.
    pub fn audit_buffer_enabled(&self) -> bool {
        self.audit_buffer_size > 0
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        if self.metrics_enabled() {
            Some(std::net::SocketAddr::from((
                [0, 0, 0, 0],
                self.metrics_port,
            )))
        } else {
            None
        }
    }

    /// Parse a variable into the specified type with a default value.
    fn parse_var<F, T>(var: &F, name: &str, default: T) -> AppResult<T>
    where
        F: Fn(&str) -> Option<String>,
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match var(name) {
            Some(val) => val
                .trim()
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            None => Ok(default),
        }
    }

    /// Split a comma-separated list, dropping blanks.
    fn parse_list(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &mask_credential(&self.api_key))
            .field("allowed_ips", &self.allowed_ips)
            .field("audit_auth_attempts", &self.audit_auth_attempts)
            .field("audit_buffer_size", &self.audit_buffer_size)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("metrics_port", &self.metrics_port)
            .finish()
    }
}

/// Default configuration for testing and development.
///
/// The key is empty and fails validation; set `api_key` before use.
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Server
            host: "0.0.0.0".to_string(),
            port: 3000,
            // Security
            api_key: String::new(),
            allowed_ips: vec!["127.0.0.1".to_string(), "::1".to_string()],
            audit_auth_attempts: true,
            audit_buffer_size: DEFAULT_MEMORY_SINK_CAPACITY,
            // Observability
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_port: 9090,
        }
    }
}
