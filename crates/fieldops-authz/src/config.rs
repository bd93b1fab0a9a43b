//! Authorizer configuration.
//!
//! Configuration is loaded from environment variables with defaults suited
//! to a single-process deployment.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Longest accepted decision lifetime, one day.
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

/// Configuration for the [`Authorizer`](crate::engine::Authorizer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthzConfig {
    /// Whether decisions are cached.
    pub cache_enabled: bool,

    /// Lifetime of a cached decision in seconds.
    pub cache_ttl_secs: u64,

    /// Upper bound on cached decisions.
    pub cache_max_entries: usize,

    /// How long an audit sink may take to accept a record before the
    /// fallback sink is used, in milliseconds.
    pub audit_timeout_ms: u64,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_ttl_secs: 60,
            cache_max_entries: 10_000,
            audit_timeout_ms: 250,
        }
    }
}

impl AuthzConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `AUTHZ_CACHE_ENABLED`: Whether to cache decisions (default: true)
    /// - `AUTHZ_CACHE_TTL_SECS`: Decision lifetime in seconds (default: 60)
    /// - `AUTHZ_CACHE_MAX_ENTRIES`: Maximum cached decisions (default: 10000)
    /// - `AUTHZ_AUDIT_TIMEOUT_MS`: Audit sink deadline in milliseconds (default: 250)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            cache_enabled: std::env::var("AUTHZ_CACHE_ENABLED")
                .map(|s| s != "false" && s != "0")
                .unwrap_or(default.cache_enabled),
            cache_ttl_secs: std::env::var("AUTHZ_CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.cache_ttl_secs),
            cache_max_entries: std::env::var("AUTHZ_CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.cache_max_entries),
            audit_timeout_ms: std::env::var("AUTHZ_AUDIT_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.audit_timeout_ms),
        }
    }

    /// Get the cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Get the audit sink deadline as a Duration.
    pub fn audit_timeout(&self) -> Duration {
        Duration::from_millis(self.audit_timeout_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_enabled && self.cache_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "AUTHZ_CACHE_TTL_SECS".to_string(),
                message: "must be greater than zero when caching is enabled".to_string(),
            });
        }
        if self.cache_enabled && self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(ConfigError::InvalidValue {
                key: "AUTHZ_CACHE_TTL_SECS".to_string(),
                message: format!("must not exceed {}", MAX_CACHE_TTL_SECS),
            });
        }
        if self.cache_enabled && self.cache_max_entries == 0 {
            return Err(ConfigError::InvalidValue {
                key: "AUTHZ_CACHE_MAX_ENTRIES".to_string(),
                message: "must be greater than zero when caching is enabled".to_string(),
            });
        }
        if self.audit_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "AUTHZ_AUDIT_TIMEOUT_MS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
